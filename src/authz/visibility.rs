use super::policy::PolicyEngine;
use super::principal::Principal;
use super::{Operation, Resource};
use crate::errors::AppResult;

impl PolicyEngine {
    /// Keep the elements of `items` the principal may read, in their original
    /// order. `to_resource` maps each element to its resolved authorization
    /// context. Leads see the collection unchanged.
    pub async fn filter<T, F>(
        &self,
        principal: &Principal,
        items: Vec<T>,
        to_resource: F,
    ) -> AppResult<Vec<T>>
    where
        F: Fn(&T) -> Resource,
    {
        if principal.role.is_lead() {
            return Ok(items);
        }

        let mut visible = Vec::with_capacity(items.len());
        for item in items {
            let decision = self
                .evaluate(principal, Operation::Read, &to_resource(&item))
                .await?;
            if decision.is_allow() {
                visible.push(item);
            }
        }

        Ok(visible)
    }
}
