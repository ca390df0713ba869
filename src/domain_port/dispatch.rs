use crate::domain_model::{Notification, UserId};

/// Push-notification dispatcher. Delivery is at-least-once and may arrive
/// on any of the target's sessions; the coordinators never assume
/// same-process delivery.
#[async_trait::async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn notify(&self, target: UserId, notification: Notification) -> anyhow::Result<()>;
}
