use hostbridge::{
    demo::{self, AttributeMap, Document, Element, NodeList, Point},
    error::AccessDirection,
    types::{DescriptorCache, HostError},
    utils::AdapterId,
    Bridge, BridgeConfig, BridgeError, ErrorKind, HostClass, HostObject, HostObjectRef,
    HostOperation, HostValue, Instantiator, Scope, ScriptObject, ScriptObjectOps, ScriptValue,
    TypeHandle, ValueKind,
};
use std::{
    any::Any,
    error::Error,
    sync::{Arc, OnceLock},
    thread,
};

pub struct TestHarness {
    pub bridge: Bridge,
    pub scope: Scope,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    fn with_config(config: BridgeConfig) -> Self {
        Self {
            bridge: Bridge::new(config),
            scope: Scope::new("test"),
        }
    }

    fn expose(&self, host: HostObjectRef) -> ScriptObject {
        match self.bridge.expose_to_script(HostValue::Object(host), &self.scope) {
            Ok(ScriptValue::Object(object)) => object,
            other => panic!("expected an object, got {other:?}"),
        }
    }

    fn get(&self, target: &ScriptObject, key: &str) -> ScriptValue {
        target.get(key, &self.scope).unwrap()
    }

    fn put(&self, target: &ScriptObject, key: &str, value: ScriptValue) {
        target.put(key, value, &self.scope).unwrap()
    }

    fn call(&self, target: &ScriptObject, name: &str, args: &[ScriptValue]) -> Result<ScriptValue, BridgeError> {
        demo::call_method(target, name, args, &self.scope)
    }
}

fn adapter_id(object: &ScriptObject) -> AdapterId {
    match object {
        ScriptObject::Instance(adapter) => adapter.id(),
        other => panic!("expected an instance adapter, got {other:?}"),
    }
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn test_identity_preserved_while_referenced() {
    let harness = TestHarness::new();
    let point: HostObjectRef = Arc::new(Point::new(1, 2));

    let first = harness.expose(point.clone());
    let second = harness.expose(point.clone());
    assert!(first.same_object(&second));
    assert_eq!(harness.bridge.live_adapters(), 1);

    let other = harness.expose(Arc::new(Point::new(1, 2)));
    assert!(!first.same_object(&other));
}

#[test]
fn test_adapter_is_rebuilt_after_it_is_collected() {
    let harness = TestHarness::new();
    let point: HostObjectRef = Arc::new(Point::new(0, 0));

    let first = harness.expose(point.clone());
    let first_id = adapter_id(&first);
    drop(first);
    assert_eq!(harness.bridge.live_adapters(), 0);
    assert_eq!(harness.bridge.sweep(), 1);

    let second = harness.expose(point);
    assert_ne!(adapter_id(&second), first_id);
}

#[test]
fn test_reuse_reparents_to_requesting_scope() {
    let harness = TestHarness::new();
    let point: HostObjectRef = Arc::new(Point::default());
    let adapter = harness.expose(point.clone());

    let other_scope = Scope::new("other");
    harness
        .bridge
        .expose_to_script(HostValue::Object(point), &other_scope)
        .unwrap();
    match &adapter {
        ScriptObject::Instance(instance) => assert_eq!(instance.parent_scope(), Some(other_scope)),
        _ => unreachable!(),
    }
}

#[test]
fn test_self_describing_value_keeps_its_adapter() {
    let harness = TestHarness::new();
    let element = Arc::new(Element::new("span"));
    let host: HostObjectRef = element.clone();

    let first = harness.expose(host.clone());
    let first_id = adapter_id(&first);
    drop(first);
    assert!(element.is_attached());
    // Not tracked in the shared map at all.
    assert_eq!(harness.bridge.live_adapters(), 0);

    let again = harness.expose(host.clone());
    assert_eq!(adapter_id(&again), first_id);

    drop(again);
    assert!(harness.bridge.release(&host));
    assert!(!element.is_attached());
    assert_ne!(adapter_id(&harness.expose(host)), first_id);
}

#[test]
fn test_concurrent_exposure_yields_one_adapter() {
    let bridge = Bridge::default();
    let point: HostObjectRef = Arc::new(Point::default());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bridge = bridge.clone();
            let point = point.clone();
            thread::spawn(move || {
                let scope = Scope::new("worker");
                match bridge.expose_to_script(HostValue::Object(point), &scope).unwrap() {
                    ScriptValue::Object(object) => object,
                    other => panic!("unexpected {other:?}"),
                }
            })
        })
        .collect();
    let adapters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for adapter in &adapters[1..] {
        assert!(adapter.same_object(&adapters[0]));
    }
}

// ============================================================================
// Properties and indexers
// ============================================================================

#[test]
fn test_property_round_trip() {
    let harness = TestHarness::new();
    let document = Arc::new(Document::new("https://example.test/"));
    let doc = harness.expose(document.clone());

    harness.put(&doc, "title", ScriptValue::from("Hello"));
    assert_eq!(document.title(), "Hello");
    assert_eq!(harness.get(&doc, "title"), ScriptValue::from("Hello"));
    assert_eq!(harness.get(&doc, "URL"), ScriptValue::from("https://example.test/"));
    assert!(harness.get(&doc, "url").is_undefined());
}

#[test]
fn test_missing_setter_is_an_access_error() {
    let harness = TestHarness::new();
    let doc = harness.expose(Arc::new(Document::default()));

    let err = doc
        .put("URL", ScriptValue::from("elsewhere"), &harness.scope)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Access);
    assert!(matches!(
        &err,
        BridgeError::Access { name, direction: AccessDirection::Write } if name == "URL"
    ));
    assert!(err.to_string().contains("URL"));
}

struct Sink;

impl Sink {
    fn host_class() -> TypeHandle {
        static CLASS: OnceLock<TypeHandle> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                HostClass::builder("Sink")
                    .namespace("test.io")
                    .operation(HostOperation::instance::<Sink, _>(
                        "setLevel",
                        &[ValueKind::Int],
                        ValueKind::Void,
                        |_, _| Ok(HostValue::Null),
                    ))
                    .build()
            })
            .clone()
    }
}

impl HostObject for Sink {
    fn host_type(&self) -> TypeHandle {
        Sink::host_class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn test_write_only_property_rejects_reads() {
    let harness = TestHarness::new();
    let sink = harness.expose(Arc::new(Sink));
    harness.put(&sink, "level", ScriptValue::Int(3));
    let err = sink.get("level", &harness.scope).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Access { direction: AccessDirection::Read, .. }
    ));
}

#[test]
fn test_ad_hoc_properties_and_undefined_clears() {
    let harness = TestHarness::new();
    let point = harness.expose(Arc::new(Point::default()));

    harness.put(&point, "label", ScriptValue::from("origin"));
    assert_eq!(harness.get(&point, "label"), ScriptValue::from("origin"));
    harness.put(&point, "label", ScriptValue::Undefined);
    assert!(harness.get(&point, "label").is_undefined());

    point.put_index(4, ScriptValue::Int(9), &harness.scope).unwrap();
    assert_eq!(point.get_index(4, &harness.scope).unwrap(), ScriptValue::Int(9));
}

#[test]
fn test_name_indexer_fallback() {
    let harness = TestHarness::new();
    let attributes = Arc::new(AttributeMap::default());
    attributes.set("foo", "bar");
    let map = harness.expose(attributes.clone());

    assert_eq!(harness.get(&map, "foo"), ScriptValue::from("bar"));
    assert!(harness.get(&map, "missing").is_undefined());
    assert_eq!(harness.get(&map, "length"), ScriptValue::Int(1));

    harness.put(&map, "lang", ScriptValue::from("en"));
    assert_eq!(attributes.get("lang").as_deref(), Some("en"));
}

#[test]
fn test_integer_indexer_reads_host_collection() {
    let harness = TestHarness::new();
    let document = Arc::new(Document::default());
    let first = document.create_element("p");
    document.create_element("div");
    let doc = harness.expose(document);

    let list = match harness.get(&doc, "elements") {
        ScriptValue::Object(list) => list,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(harness.get(&list, "length"), ScriptValue::Int(2));

    let item = list.get_index(0, &harness.scope).unwrap();
    let expected = harness.expose(first);
    assert_eq!(item, ScriptValue::Object(expected));
    assert_eq!(list.get_index(5, &harness.scope).unwrap(), ScriptValue::Null);
    assert!(matches!(
        list.put_index(0, ScriptValue::Null, &harness.scope),
        Err(BridgeError::Access { direction: AccessDirection::Write, .. })
    ));
}

#[test]
fn test_static_constants_visible_through_instances() {
    let harness = TestHarness::new();
    let doc = harness.expose(Arc::new(Document::default()));
    assert_eq!(harness.get(&doc, "ELEMENT_NODE"), ScriptValue::Int(1));
    assert_eq!(harness.get(&doc, "TEXT_NODE"), ScriptValue::Int(3));
}

#[test]
fn test_integer_indexer_only_type_falls_through_for_named_keys() {
    let harness = TestHarness::new();
    let list = harness.expose(Arc::new(NodeList::new(Vec::new())));

    assert!(list.get("someKey", &harness.scope).unwrap().is_undefined());
    harness.put(&list, "someKey", ScriptValue::Int(3));
    assert_eq!(harness.get(&list, "someKey"), ScriptValue::Int(3));
    assert_eq!(harness.get(&list, "length"), ScriptValue::Int(0));
}

#[test]
fn test_static_constants_reject_writes() {
    let harness = TestHarness::new();
    let doc = harness.expose(Arc::new(Document::default()));

    let err = doc
        .put("ELEMENT_NODE", ScriptValue::Int(42), &harness.scope)
        .unwrap_err();
    assert!(matches!(
        &err,
        BridgeError::Access { name, direction: AccessDirection::Write } if name == "ELEMENT_NODE"
    ));
    assert_eq!(harness.get(&doc, "ELEMENT_NODE"), ScriptValue::Int(1));
    assert!(!doc.delete("ELEMENT_NODE"));

    let ctor = match harness.bridge.constructor_for(&Document::host_class()).unwrap() {
        ScriptValue::Object(ctor) => ctor,
        other => panic!("unexpected {other:?}"),
    };
    assert!(ctor.put("TEXT_NODE", ScriptValue::Int(7), &harness.scope).is_err());
    assert_eq!(harness.get(&ctor, "TEXT_NODE"), ScriptValue::Int(3));
}

// ============================================================================
// Methods
// ============================================================================

#[test]
fn test_method_callables_are_memoized() {
    let harness = TestHarness::new();
    let doc = harness.expose(Arc::new(Document::default()));
    assert_eq!(harness.get(&doc, "createElement"), harness.get(&doc, "createElement"));
}

fn overloaded_class() -> TypeHandle {
    HostClass::builder("Overloads")
        .namespace("test.dispatch")
        .operation(HostOperation::static_fn("f", &[ValueKind::String], ValueKind::String, |_| {
            Ok(HostValue::from("string"))
        }))
        .operation(HostOperation::static_fn("f", &[ValueKind::Int], ValueKind::String, |_| {
            Ok(HostValue::from("int"))
        }))
        .operation(HostOperation::static_fn(
            "fail",
            &[],
            ValueKind::Void,
            |_| Err(HostError::with_cause("operation failed", std::fmt::Error)),
        ))
        .build()
}

#[test]
fn test_overload_exactness() {
    let harness = TestHarness::new();
    let ty = overloaded_class();
    let ctor = match harness.bridge.constructor_for(&ty).unwrap() {
        ScriptValue::Object(ctor) => ctor,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(harness.call(&ctor, "f", &[ScriptValue::Int(1)]).unwrap(), ScriptValue::from("int"));
    assert_eq!(harness.call(&ctor, "f", &[ScriptValue::from("a")]).unwrap(), ScriptValue::from("string"));
}

#[test]
fn test_host_failure_surfaces_as_invocation_error() {
    let harness = TestHarness::new();
    let ctor = match harness.bridge.constructor_for(&overloaded_class()).unwrap() {
        ScriptValue::Object(ctor) => ctor,
        other => panic!("unexpected {other:?}"),
    };
    let err = harness.call(&ctor, "fail", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invocation);
    let host = err.source().unwrap();
    assert_eq!(host.to_string(), "operation failed");
    assert!(host.source().is_some());
}

#[test]
fn test_bound_method_and_argument_coercion() {
    let harness = TestHarness::new();
    let point = Arc::new(Point::new(1, 1));
    let adapter = harness.expose(point.clone());

    harness
        .call(&adapter, "translate", &[ScriptValue::from("2"), ScriptValue::Float(3.7)])
        .unwrap();
    assert_eq!((point.x(), point.y()), (3, 4));

    let other = harness.expose(Arc::new(Point::new(0, 0)));
    let distance = harness
        .call(&adapter, "distanceTo", &[ScriptValue::Object(other)])
        .unwrap();
    assert_eq!(distance, ScriptValue::Float(5.0));

    let err = harness
        .call(&adapter, "distanceTo", &[ScriptValue::Int(1)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::Invocation { .. }));
}

#[test]
fn test_too_few_arguments_fail_without_calling_the_host() {
    let harness = TestHarness::new();
    let point = Arc::new(Point::new(1, 1));
    let adapter = harness.expose(point.clone());

    let err = harness
        .call(&adapter, "translate", &[ScriptValue::Int(5)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(matches!(
        &err,
        BridgeError::NoMatchingOperation { name, arity: 1 } if name == "translate"
    ));
    assert_eq!((point.x(), point.y()), (1, 1));
}

#[test]
fn test_method_values_keep_ad_hoc_properties() {
    let harness = TestHarness::new();
    let doc = harness.expose(Arc::new(Document::default()));
    let function = match harness.get(&doc, "createElement") {
        ScriptValue::Object(function) => function,
        other => panic!("unexpected {other:?}"),
    };

    harness.put(&function, "tag", ScriptValue::Int(1));
    assert_eq!(harness.get(&function, "tag"), ScriptValue::Int(1));
    match harness.get(&doc, "createElement") {
        ScriptValue::Object(again) => assert_eq!(harness.get(&again, "tag"), ScriptValue::Int(1)),
        other => panic!("unexpected {other:?}"),
    }

    harness.put(&function, "tag", ScriptValue::Undefined);
    assert!(harness.get(&function, "tag").is_undefined());
    assert!(function.put("name", ScriptValue::from("other"), &harness.scope).is_err());
    assert_eq!(harness.get(&function, "name"), ScriptValue::from("createElement"));
}

#[test]
fn test_raw_script_operation_receives_arguments_unconverted() {
    let harness = TestHarness::new();
    let doc = harness.expose(Arc::new(Document::default()));
    let result = harness
        .call(&doc, "format", &[ScriptValue::from("a"), ScriptValue::Int(1), ScriptValue::Bool(true)])
        .unwrap();
    assert_eq!(result, ScriptValue::from("a 1 true"));
}

#[test]
fn test_returned_host_objects_are_wrapped() {
    let harness = TestHarness::new();
    let doc = harness.expose(Arc::new(Document::default()));
    let element = harness
        .call(&doc, "createElement", &[ScriptValue::from("div")])
        .unwrap();
    let element = match element {
        ScriptValue::Object(element) => element,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(harness.get(&element, "tagName"), ScriptValue::from("DIV"));
    harness.put(&element, "id", ScriptValue::from("main"));
    assert_eq!(
        element.default_value(hostbridge::value::Hint::String),
        ScriptValue::from("<div id=\"main\">")
    );
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_construct_point_and_mutate() {
    let harness = TestHarness::new();
    let ctor = match harness.bridge.constructor_for(&Point::host_class()).unwrap() {
        ScriptValue::Object(ctor) => ctor,
        other => panic!("unexpected {other:?}"),
    };
    let point = match ctor.construct(&[ScriptValue::Int(99)], &harness.scope).unwrap() {
        ScriptValue::Object(point) => point,
        other => panic!("unexpected {other:?}"),
    };
    harness.put(&point, "x", ScriptValue::Int(5));
    assert_eq!(harness.get(&point, "x"), ScriptValue::Int(5));
    assert_eq!(harness.get(&point, "y"), ScriptValue::Int(0));
    assert!(ctor.has_instance(&ScriptValue::Object(point)));
    assert_eq!(harness.get(&ctor, "ORIGIN_X"), ScriptValue::Int(0));
}

#[test]
fn test_construction_failure_is_generic() {
    let harness = TestHarness::new();
    let ty = Point::host_class();
    let failing = Instantiator::new(|| Err(HostError::new("out of widgets")));
    let ctor = match harness.bridge.constructor_with(&ty, failing).unwrap() {
        ScriptValue::Object(ctor) => ctor,
        other => panic!("unexpected {other:?}"),
    };
    let err = ctor.construct(&[], &harness.scope).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Construction);
    assert!(matches!(
        &err,
        BridgeError::Construction { type_name, message } if type_name == "Point" && message == "out of widgets"
    ));

    let element_ctor = match harness.bridge.constructor_for(&Element::host_class()).unwrap() {
        ScriptValue::Object(ctor) => ctor,
        other => panic!("unexpected {other:?}"),
    };
    assert!(matches!(
        element_ctor.construct(&[], &harness.scope),
        Err(BridgeError::Construction { .. })
    ));
}

#[test]
fn test_constructed_objects_share_identity_with_later_exposure() {
    let harness = TestHarness::new();
    let captured: Arc<parking_lot::Mutex<Option<HostObjectRef>>> = Arc::default();
    let slot = captured.clone();
    let instantiator = Instantiator::new(move || {
        let point: HostObjectRef = Arc::new(Point::new(7, 7));
        *slot.lock() = Some(point.clone());
        Ok(point)
    });
    let ctor = match harness
        .bridge
        .constructor_with(&Point::host_class(), instantiator)
        .unwrap()
    {
        ScriptValue::Object(ctor) => ctor,
        other => panic!("unexpected {other:?}"),
    };
    let constructed = match ctor.construct(&[], &harness.scope).unwrap() {
        ScriptValue::Object(object) => object,
        other => panic!("unexpected {other:?}"),
    };
    let host = captured.lock().clone().unwrap();
    assert!(harness.expose(host).same_object(&constructed));
}

// ============================================================================
// Descriptors and configuration
// ============================================================================

#[test]
fn test_descriptor_naming_conventions() {
    let harness = TestHarness::new();
    let descriptor = harness.bridge.describe(&Document::host_class()).unwrap();
    assert!(descriptor.property("URL").is_some());
    assert!(descriptor.property("title").is_some());
    assert!(descriptor.property("uRL").is_none());
    assert!(descriptor.method("toString").is_none());
}

#[test]
fn test_shared_descriptor_cache_across_bridges() {
    let a = Bridge::with_descriptor_cache(BridgeConfig::default(), DescriptorCache::shared());
    let b = Bridge::new(BridgeConfig::default());
    let ty = Point::host_class();
    assert!(Arc::ptr_eq(&a.describe(&ty).unwrap(), &b.describe(&ty).unwrap()));
}

#[test]
fn test_class_shutter_blocks_exposure() {
    let mut config = BridgeConfig::default();
    config.policy = config
        .policy
        .with_class_shutter(|class: &HostClass| class.name() != "Point");
    let harness = TestHarness::with_config(config);
    let err = harness
        .bridge
        .expose_to_script(HostValue::Object(Arc::new(Point::default())), &harness.scope)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(err, BridgeError::ClassHidden(_)));
}

#[test]
fn test_unwrap_from_script() {
    let harness = TestHarness::new();
    let point: HostObjectRef = Arc::new(Point::new(2, 3));
    let adapter = ScriptValue::Object(harness.expose(point.clone()));

    match harness.bridge.unwrap_from_script(&adapter, &ValueKind::Any).unwrap() {
        HostValue::Object(host) => assert!(Arc::ptr_eq(&host, &point)),
        other => panic!("unexpected {other:?}"),
    }
    match harness.bridge.unwrap_from_script(&adapter, &ValueKind::String).unwrap() {
        HostValue::Str(text) => assert_eq!(text, "Point(2, 3)"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        harness.bridge.unwrap_from_script(&ScriptValue::Undefined, &ValueKind::String),
        Ok(HostValue::Null)
    ));
}

// ============================================================================
// Churn
// ============================================================================

#[test]
fn test_churn_does_not_accumulate_adapters() {
    let config = BridgeConfig {
        sweep_threshold: 64,
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(config);
    let report = demo::churn(&bridge, 2_000).unwrap();
    assert_eq!(report.elements_created, 2_000);
    assert_eq!(report.elements_attached, 0);
    assert_eq!(report.live_adapters, 0);
}
