#![no_main]
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};
use tenant_responder::routing::{self, ReplyRouter};
use tenant_responder::tenants::{self, TenantDirectory};
use tenant_responder::Config;

fn router() -> &'static dyn ReplyRouter {
    static ROUTER: OnceLock<Box<dyn ReplyRouter>> = OnceLock::new();
    ROUTER
        .get_or_init(|| {
            let config = Config::default();
            let directory: Arc<dyn TenantDirectory> =
                Arc::new(tenants::create_registry(&config.tenants).unwrap());
            routing::create_router(directory, &config.responder)
        })
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);
    let outcome = router().route("+15551112222", &body);
    assert!(outcome.tenant.is_some());
});
