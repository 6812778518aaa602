pub mod attachments;
pub mod auth;
pub mod comments;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod teams;
