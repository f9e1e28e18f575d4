#![allow(dead_code)]

use std::sync::Arc;

use hwio::native::NativeBusFactory;
use hwio::Context;
use hwio_mock::{MockBusTable, MockNative, MockPlugin};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Context with the mock plugin loaded and its platform active.
pub fn mock_context(native: &MockNative) -> Context {
    let context = Context::builder()
        .plugin(MockPlugin::with_native(native.clone()))
        .auto_activate(true)
        .build()
        .unwrap();
    assert_eq!(context.plugin_ids(), ["mock"]);
    context
}

pub fn bus_table(native: &MockNative) -> MockBusTable {
    MockBusTable::new(NativeBusFactory::linux(Arc::new(native.clone())))
}
