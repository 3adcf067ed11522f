//! Compensation stack for multi-step provisioning.
//!
//! Each remote resource created while issuing a credential registers the step
//! that deletes it. If a later step fails, the registered deletions run in
//! reverse order. The triggering failure is always reported; cleanup failures
//! are attached to it rather than replacing it.

use std::fmt;
use std::future::Future;

use tracing::error;
use tracing::warn;

use crate::client::GrafanaApi;
use crate::error::ClientError;
use crate::error::SecretsError;

/// A deletion that undoes one provisioning step.
///
/// Also used by the revoker: revoking a credential is running the compensation
/// for its primary resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Delete a Grafana Cloud access policy (and, with it, its tokens).
    DeleteAccessPolicy { region: String, access_policy_id: String },
    /// Delete a service account inside a Grafana Cloud stack.
    DeleteCloudServiceAccount { stack: String, service_account_id: i64 },
    /// Delete a service account on a Grafana instance.
    DeleteServiceAccount { service_account_id: i64 },
}

impl Compensation {
    /// Run the deletion.
    pub async fn run(&self, api: &dyn GrafanaApi) -> Result<(), ClientError> {
        match self {
            Compensation::DeleteAccessPolicy {
                region,
                access_policy_id,
            } => api.delete_access_policy(region, access_policy_id).await,
            Compensation::DeleteCloudServiceAccount {
                stack,
                service_account_id,
            } => api.delete_cloud_service_account(stack, *service_account_id).await,
            Compensation::DeleteServiceAccount { service_account_id } => {
                api.delete_service_account(*service_account_id).await
            }
        }
    }
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::DeleteAccessPolicy {
                region,
                access_policy_id,
            } => write!(f, "deleting cloud access policy {access_policy_id} in region {region}"),
            Compensation::DeleteCloudServiceAccount {
                stack,
                service_account_id,
            } => write!(f, "deleting service account {service_account_id} in stack {stack}"),
            Compensation::DeleteServiceAccount { service_account_id } => {
                write!(f, "deleting service account {service_account_id}")
            }
        }
    }
}

/// Ordered list of pending compensations for one provisioning attempt.
pub struct RollbackStack<'a> {
    api: &'a dyn GrafanaApi,
    pending: Vec<Compensation>,
}

impl<'a> RollbackStack<'a> {
    /// Start an empty stack against `api`.
    pub fn new(api: &'a dyn GrafanaApi) -> Self {
        Self {
            api,
            pending: Vec::new(),
        }
    }

    /// Register the undo step for a resource that now exists remotely.
    pub fn push(&mut self, compensation: Compensation) {
        self.pending.push(compensation);
    }

    /// Number of registered compensations.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no compensation is registered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Await a provisioning step. On failure, unwind everything registered so far.
    pub async fn step<T, F>(&mut self, step: F) -> Result<T, SecretsError>
    where F: Future<Output = Result<T, SecretsError>> {
        match step.await {
            Ok(value) => Ok(value),
            Err(cause) => Err(self.unwind(cause).await),
        }
    }

    /// Run every registered compensation in reverse order and fold the result
    /// into `cause`.
    ///
    /// Returns `cause` unchanged when every compensation succeeded, otherwise a
    /// [`SecretsError::Compensation`] carrying `cause` and every cleanup failure.
    pub async fn unwind(&mut self, cause: SecretsError) -> SecretsError {
        let pending = std::mem::take(&mut self.pending);
        let mut failures = Vec::new();

        for compensation in pending.iter().rev() {
            warn!(step = %compensation, error = %cause, "rolling back partially provisioned credential");
            if let Err(e) = compensation.run(self.api).await {
                error!(step = %compensation, error = %e, "rollback step failed; remote resource may be leaked");
                failures.push(format!("{compensation}: {e}"));
            }
        }

        if failures.is_empty() {
            cause
        } else {
            SecretsError::Compensation {
                cause: Box::new(cause),
                failures,
            }
        }
    }

    /// Provisioning finished; the created resources now belong to the credential.
    pub fn commit(mut self) {
        self.pending.clear();
    }
}

impl Drop for RollbackStack<'_> {
    fn drop(&mut self) {
        for compensation in &self.pending {
            error!(step = %compensation, "provisioning abandoned without rollback; remote resource may be leaked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ApiCall;
    use crate::testing::MockGrafanaApi;

    fn remote_failure() -> SecretsError {
        SecretsError::Remote {
            operation: "creating service account token".into(),
            source: ClientError::Api {
                status: 500,
                body: "boom".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_unwind_runs_in_reverse() {
        let api = MockGrafanaApi::new();
        let mut stack = RollbackStack::new(&api);
        stack.push(Compensation::DeleteServiceAccount { service_account_id: 1 });
        stack.push(Compensation::DeleteAccessPolicy {
            region: "us".into(),
            access_policy_id: "p2".into(),
        });

        let err = stack.unwind(remote_failure()).await;
        assert!(matches!(err, SecretsError::Remote { .. }));
        assert!(stack.is_empty());

        assert_eq!(
            api.calls().await,
            vec![
                ApiCall::DeleteAccessPolicy {
                    region: "us".into(),
                    access_policy_id: "p2".into(),
                },
                ApiCall::DeleteServiceAccount { service_account_id: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_triggering_error() {
        let api = MockGrafanaApi::new();
        api.fail_on("delete_service_account", 503).await;

        let mut stack = RollbackStack::new(&api);
        stack.push(Compensation::DeleteServiceAccount { service_account_id: 7 });

        let err = stack.unwind(remote_failure()).await;
        let SecretsError::Compensation { cause, failures } = &err else {
            panic!("expected compensation error, got {err}");
        };
        assert!(matches!(cause.as_ref(), SecretsError::Remote { .. }));
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("deleting service account 7"));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_step_and_commit() {
        let api = MockGrafanaApi::new();
        let mut stack = RollbackStack::new(&api);
        stack.push(Compensation::DeleteServiceAccount { service_account_id: 3 });

        let value = stack.step(async { Ok::<_, SecretsError>(5) }).await.unwrap();
        assert_eq!(value, 5);
        assert_eq!(stack.len(), 1);

        stack.commit();
        assert!(api.calls().await.is_empty());
    }
}
