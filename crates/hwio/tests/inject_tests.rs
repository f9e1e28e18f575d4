mod common;

use common::{input_config, output_config, StubProvider};
use hwio::{
    Context, DigitalInput, DigitalOutput, Error, I2c, Io, IoCategory,
    InjectionRequest, Wiring, WiringConfig,
};

fn context() -> Context {
    let context = Context::builder()
        .provider(StubProvider::new("out", IoCategory::DigitalOutput))
        .provider(StubProvider::new("in", IoCategory::DigitalInput))
        .build()
        .unwrap();
    context.create_instance(output_config("led")).unwrap();
    context.create_instance(input_config("button")).unwrap();
    context
}

#[test]
fn request_resolves_by_slot_name_or_id() {
    let context = context();

    let by_slot = InjectionRequest::new("led", IoCategory::DigitalOutput);
    assert_eq!(context.resolve(&by_slot).unwrap().id(), "led");

    let by_id = InjectionRequest::new("status", IoCategory::DigitalOutput)
        .with_id("led");
    assert_eq!(by_id.target(), "led");
    assert_eq!(context.resolve(&by_id).unwrap().id(), "led");
}

#[test]
fn request_errors_propagate() {
    let context = context();

    let missing = InjectionRequest::new("fan", IoCategory::Pwm);
    assert!(matches!(
        context.resolve(&missing),
        Err(Error::NotFound { ref id }) if id == "fan"
    ));

    let wrong = InjectionRequest::new("led", IoCategory::DigitalInput);
    assert!(matches!(context.resolve(&wrong), Err(Error::TypeMismatch { .. })));
}

#[test]
fn wiring_resolves_every_slot() {
    let context = context();

    let wired = context
        .wire(
            &Wiring::new()
                .slot::<dyn DigitalOutput>("led")
                .slot_with_id::<dyn DigitalInput>("trigger", "button"),
        )
        .unwrap();

    assert_eq!(wired.len(), 2);
    let led = wired.get::<dyn DigitalOutput>("led").unwrap();
    led.high().unwrap();
    assert!(context.get_as::<dyn DigitalOutput>("led").unwrap().is_high());

    let trigger = wired.get::<dyn DigitalInput>("trigger").unwrap();
    assert_eq!(trigger.id(), "button");

    assert!(matches!(
        wired.get::<dyn DigitalOutput>("nope"),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        wired.get::<dyn DigitalInput>("led"),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn wiring_reports_every_failed_slot() {
    let context = context();

    let err = context
        .wire(
            &Wiring::new()
                .slot::<dyn DigitalOutput>("led")
                .slot::<dyn I2c>("sensor")
                .slot::<dyn DigitalOutput>("button")
                .slot::<dyn DigitalOutput>("led"),
        )
        .unwrap_err();

    let slots: Vec<&str> = err.slots().collect();
    assert_eq!(slots, ["sensor", "button", "led"]);
    assert!(matches!(err.failures[0].1, Error::NotFound { .. }));
    assert!(matches!(err.failures[1].1, Error::TypeMismatch { .. }));
    assert!(matches!(err.failures[2].1, Error::InvalidConfig { .. }));
}

#[test]
fn wiring_from_json() {
    let context = context();
    let config = WiringConfig::from_json_str(
        r#"{
            "slots": [
                { "slot": "led", "category": "digital_output" },
                { "slot": "input", "id": "button", "category": "digital_input" }
            ]
        }"#,
    )
    .unwrap();

    let wired = context.wire(&Wiring::from(config)).unwrap();
    assert!(wired.instance("input").is_some());
    assert_eq!(wired.instance("input").unwrap().id(), "button");
}
