//! Credential revocation.

use crate::client::GrafanaApi;
use crate::credentials::tracking::TrackedResource;
use crate::error::Result;
use crate::error::SecretsError;

/// Delete the remote resource backing a credential.
///
/// Every failure, including a 404, is returned unchanged and the credential
/// stays unrevoked. A 404 can come from a mount that now points at a different
/// server or stack while the resource is still alive, so the host keeps
/// retrying instead.
pub async fn revoke_resource(api: &dyn GrafanaApi, resource: &TrackedResource) -> Result<()> {
    let compensation = resource.compensation();

    compensation.run(api).await.map_err(|source| SecretsError::Remote {
        operation: compensation.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ApiCall;
    use crate::testing::MockGrafanaApi;

    #[tokio::test]
    async fn test_dispatch_by_shape() {
        let api = MockGrafanaApi::new();

        revoke_resource(&api, &TrackedResource::CloudServiceAccount {
            stack: "acme".into(),
            service_account_id: 4,
        })
        .await
        .unwrap();
        revoke_resource(&api, &TrackedResource::CloudAccessPolicy {
            region: "eu".into(),
            access_policy_id: "ap-9".into(),
        })
        .await
        .unwrap();
        revoke_resource(&api, &TrackedResource::ServiceAccount { service_account_id: 2 }).await.unwrap();

        assert_eq!(api.calls().await, vec![
            ApiCall::DeleteCloudServiceAccount {
                stack: "acme".into(),
                service_account_id: 4,
            },
            ApiCall::DeleteAccessPolicy {
                region: "eu".into(),
                access_policy_id: "ap-9".into(),
            },
            ApiCall::DeleteServiceAccount { service_account_id: 2 },
        ]);
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let api = MockGrafanaApi::new();
        api.fail_on("delete_service_account", 500).await;

        let err = revoke_resource(&api, &TrackedResource::ServiceAccount { service_account_id: 2 }).await.unwrap_err();
        assert!(matches!(err, SecretsError::Remote { .. }));
        assert!(err.to_string().contains("deleting service account 2"));
        assert_eq!(api.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_revoked() {
        let api = MockGrafanaApi::new();
        api.fail_on("delete_access_policy", 404).await;

        let resource = TrackedResource::CloudAccessPolicy {
            region: "eu".into(),
            access_policy_id: "ap-9".into(),
        };
        let err = revoke_resource(&api, &resource).await.unwrap_err();
        let SecretsError::Remote { operation, source } = &err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(operation, "deleting cloud access policy ap-9 in region eu");
        assert_eq!(source.status(), Some(404));
    }
}
