
use crate::repositories::MockRevocationStore;
use crate::services::token::{KeyManager, TokenService, TokenServiceConfig};

pub(super) const SERVICE_PRIVATE_PEM: &str =
    include_str!("../../../../tests/fixtures/service_private.pem");
pub(super) const SERVICE_PUBLIC_PEM: &str =
    include_str!("../../../../tests/fixtures/service_public.pem");
pub(super) const FOREIGN_PRIVATE_PEM: &str =
    include_str!("../../../../tests/fixtures/foreign_private.pem");
pub(super) const FOREIGN_PUBLIC_PEM: &str =
    include_str!("../../../../tests/fixtures/foreign_public.pem");

pub(super) fn service_keys() -> KeyManager {
    KeyManager::from_pem_strings(SERVICE_PRIVATE_PEM, SERVICE_PUBLIC_PEM).unwrap()
}

pub(super) fn service_with(
    store: MockRevocationStore,
    config: TokenServiceConfig,
) -> TokenService<MockRevocationStore> {
    TokenService::new(store, service_keys(), config)
}

pub(super) fn test_service() -> TokenService<MockRevocationStore> {
    service_with(MockRevocationStore::new(), TokenServiceConfig::default())
}
