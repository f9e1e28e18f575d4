mod common;

use std::sync::Arc;

use common::{init_tracing, mock_context};
use hwio::{
    AnalogOutput, BasicPlatform, Context, ContextConfig, DigitalBinding,
    DigitalOutput, DigitalState, Error, I2c, IoCategory, IoConfig, Pwm,
    Serial, Spi, ThresholdBinding, Wiring, WiringConfig,
};
use hwio_mock::{
    MockAnalogInput, MockDigitalInput, MockNative, MockPlugin,
    MOCK_PLATFORM_ID, MOCK_PROVIDER_IDS,
};

#[test]
fn mock_plugin_serves_every_category() {
    init_tracing();
    let native = MockNative::new();
    let context = mock_context(&native);

    assert_eq!(
        context.active_platform().map(|p| p.id().to_owned()).as_deref(),
        Some(MOCK_PLATFORM_ID)
    );
    let mut providers: Vec<String> =
        context.providers().iter().map(|p| p.id().to_owned()).collect();
    providers.sort();
    let mut expected = MOCK_PROVIDER_IDS.map(str::to_owned).to_vec();
    expected.sort();
    assert_eq!(providers, expected);

    let configs = [
        IoConfig::digital_input("button", 17),
        IoConfig::digital_output("led", 4),
        IoConfig::analog_input("pot", 0),
        IoConfig::analog_output("dac", 1),
        IoConfig::pwm("fan", 18, 25_000),
        IoConfig::i2c("bme280", 1, 0x76),
        IoConfig::spi("adc", 0, 1_000_000),
        IoConfig::serial("gps", "/dev/ttyAMA0", 9600),
    ];
    for config in configs {
        let config = config.build().unwrap();
        let category = config.category();
        let instance = context.create_instance(config).unwrap();
        assert_eq!(instance.category(), category);
        assert!(instance.provider_id().starts_with("mock-"));
    }
    assert_eq!(context.registry().len(), 8);

    let fan = context.get_as::<dyn Pwm>("fan").unwrap();
    fan.set_duty_cycle(50.0).unwrap();
    fan.on().unwrap();
    assert!(fan.is_on());

    let dac = context.get_as::<dyn AnalogOutput>("dac").unwrap();
    dac.set_value(300).unwrap();
    assert_eq!(dac.value(), 300);

    let gps = context.get_as::<dyn Serial>("gps").unwrap();
    assert_eq!(gps.device(), "/dev/ttyAMA0");
    assert!(native.is_open("/dev/ttyAMA0"));

    assert!(matches!(
        context.get_as::<dyn Spi>("bme280"),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn shutdown_closes_every_native_handle() {
    let native = MockNative::new();
    let context = mock_context(&native);
    context
        .create::<dyn I2c>(IoConfig::i2c("a", 1, 0x20).build().unwrap())
        .unwrap();
    context
        .create::<dyn Spi>(IoConfig::spi("b", 0, 8_000_000).build().unwrap())
        .unwrap();
    context
        .create::<dyn Serial>(
            IoConfig::serial("c", "/dev/ttyS0", 115_200).build().unwrap(),
        )
        .unwrap();
    assert_eq!(native.open_handles(), 3);

    context.shutdown().unwrap();
    assert_eq!(native.open_handles(), 0);
    assert!(matches!(
        context.create::<dyn I2c>(IoConfig::i2c("d", 1, 0x21).build().unwrap()),
        Err(Error::ShutDown)
    ));
}

#[test]
fn mock_plugin_is_skipped_when_mocks_are_disabled() {
    let context = Context::builder()
        .auto_detect_mock(false)
        .plugin(MockPlugin::new())
        .build()
        .unwrap();

    assert!(context.plugin_ids().is_empty());
    assert!(context.providers().is_empty());
    assert!(matches!(
        context.activate_platform(None),
        Err(Error::PlatformNotFound { id: None })
    ));
}

#[test]
fn a_detected_board_outranks_the_mock_platform() {
    let native = MockNative::new();
    let context = Context::builder()
        .plugin(MockPlugin::with_native(native.clone()))
        .platform(BasicPlatform::new("board", "Test Board").priority(5))
        .build()
        .unwrap();

    let active = context.activate_platform(None).unwrap();
    assert_eq!(active.id(), "board");

    // The board lists no providers, so any provider of the category serves.
    context
        .create::<dyn DigitalOutput>(IoConfig::digital_output("led", 4).build().unwrap())
        .unwrap();
    let led = context.get("led", IoCategory::DigitalOutput).unwrap();
    assert_eq!(led.provider_id(), "mock-digital-output");
}

#[test]
fn declared_instances_are_created_and_wired() {
    let config = ContextConfig::from_json_str(
        r#"{
            "auto_activate": true,
            "instances": [
                { "id": "led", "type": "digital_output", "address": 4,
                  "initial": "high", "shutdown": "low" },
                { "id": "bme280", "type": "i2c", "bus": 1, "device": 118 }
            ]
        }"#,
    )
    .unwrap();
    let native = MockNative::new();
    let context = Context::builder()
        .config(config)
        .plugin(MockPlugin::with_native(native.clone()))
        .build()
        .unwrap();
    assert!(native.is_open("/dev/i2c-1"));

    let wiring: Wiring = WiringConfig::from_json_str(
        r#"{ "slots": [
            { "slot": "status", "id": "led", "category": "digital_output" },
            { "slot": "bme280", "category": "i2c" }
        ] }"#,
    )
    .unwrap()
    .into();
    let wired = context.wire(&wiring).unwrap();

    let status = wired.get::<dyn DigitalOutput>("status").unwrap();
    assert!(status.is_high());
    let sensor = wired.get::<dyn I2c>("bme280").unwrap();
    assert_eq!(sensor.device(), 118);

    context.shutdown().unwrap();
    assert!(status.is_low());
    assert!(!native.is_open("/dev/i2c-1"));
}

#[test]
fn button_drives_bound_leds() {
    init_tracing();
    let native = MockNative::new();
    let context = mock_context(&native);
    let red = context
        .create::<dyn DigitalOutput>(IoConfig::digital_output("red", 5).build().unwrap())
        .unwrap();
    let green = context
        .create::<dyn DigitalOutput>(IoConfig::digital_output("green", 6).build().unwrap())
        .unwrap();

    let button = Arc::new(
        MockDigitalInput::new(IoConfig::digital_input("button", 17).build().unwrap())
            .unwrap(),
    );
    let follow = DigitalBinding::attach(&button);
    follow.add(&red);
    let invert = DigitalBinding::attach(&button).inverted(true);
    invert.add(&green);

    button.mock_state(DigitalState::High);
    assert!(red.is_high());
    assert!(green.is_low());

    button.mock_state(DigitalState::Low);
    assert!(red.is_low());
    assert!(green.is_high());

    drop(follow);
    button.mock_state(DigitalState::High);
    assert!(red.is_low());
    assert!(green.is_low());
}

#[test]
fn threshold_binding_switches_with_hysteresis() {
    let native = MockNative::new();
    let context = mock_context(&native);
    let heater = context
        .create::<dyn DigitalOutput>(IoConfig::digital_output("heater", 12).build().unwrap())
        .unwrap();
    let sensor = Arc::new(
        MockAnalogInput::new(IoConfig::analog_input("temp", 0).build().unwrap()).unwrap(),
    );

    let binding = ThresholdBinding::attach(&sensor, 700, 300).unwrap();
    binding.add(&heater);

    sensor.mock_value(800);
    assert!(heater.is_high());
    sensor.mock_value(500);
    assert!(heater.is_high());
    sensor.mock_value(200);
    assert!(heater.is_low());
    sensor.mock_value(500);
    assert!(heater.is_low());
    assert_eq!(binding.last_value(), 500);

    assert_eq!(context.get("heater", IoCategory::DigitalOutput).unwrap().id(), "heater");
}
