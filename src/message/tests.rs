use serde_json::json;

use super::{Message, RawMessage, RequestId};
use crate::Error;

#[test]
fn classify_request() {
    let m = Message::classify(json!({"jsonrpc":"2.0","id":1,"method":"add","params":[1,2]}));
    match m {
        Ok(Message::Request(m)) => {
            assert_eq!(m.id, Some(RequestId::Number(1)));
            assert_eq!(m.method, "add");
            assert_eq!(m.params, Some(json!([1, 2])));
        }
        _ => panic!("not classified as a request"),
    }
}

#[test]
fn classify_notification_has_no_id() {
    let m = Message::classify(json!({"jsonrpc":"2.0","method":"ping"}));
    match m {
        Ok(Message::Request(m)) => {
            assert_eq!(m.id, None);
            assert_eq!(m.method, "ping");
            assert_eq!(m.params, None);
        }
        _ => panic!("not classified as a notification"),
    }
}

#[test]
fn classify_response() {
    let m = Message::classify(json!({"jsonrpc":"2.0","result":{"ok":true},"id":7}));
    match m {
        Ok(Message::Response(m)) => {
            assert_eq!(m.id, Some(RequestId::Number(7)));
            assert_eq!(m.result, json!({"ok":true}));
        }
        _ => panic!("not classified as a response"),
    }
}

#[test]
fn null_result_is_still_a_response() {
    let m = Message::classify(json!({"jsonrpc":"2.0","result":null,"id":7}));
    match m {
        Ok(Message::Response(m)) => assert_eq!(m.result, json!(null)),
        _ => panic!("result presence must win over result value"),
    }
}

#[test]
fn result_takes_precedence_over_method() {
    let m = Message::classify(json!({"jsonrpc":"2.0","result":1,"method":"x","id":7}));
    assert!(matches!(m, Ok(Message::Response(_))));
}

#[test]
fn classify_error_response() {
    let m = Message::classify(
        json!({"jsonrpc":"2.0","error":{"code":-32600,"message":"bad"},"id":3}),
    );
    match m {
        Ok(Message::Error(m)) => {
            assert_eq!(m.id, Some(RequestId::Number(3)));
            assert_eq!(m.error["code"], json!(-32600));
        }
        _ => panic!("not classified as an error response"),
    }
}

#[test]
fn null_id_counts_as_absent() {
    let m = Message::classify(json!({"jsonrpc":"2.0","error":"denied","id":null}));
    match m {
        Ok(Message::Error(m)) => assert_eq!(m.id, None),
        _ => panic!("not classified as an error response"),
    }
}

#[test]
fn non_object_is_invalid() {
    let m = Message::classify(json!(42));
    match m {
        Err(Error::InvalidMessage(v)) => assert_eq!(v, json!(42)),
        _ => panic!("expected an invalid-message error"),
    }
}

#[test]
fn object_with_no_known_field_is_invalid() {
    let m = Message::classify(json!({"jsonrpc":"2.0","id":1}));
    assert!(matches!(m, Err(Error::InvalidMessage(_))));
}

#[test]
fn non_string_method_is_invalid() {
    let m = Message::classify(json!({"jsonrpc":"2.0","method":5,"id":1}));
    match m {
        Err(Error::InvalidMessage(v)) => assert_eq!(v["method"], json!(5)),
        _ => panic!("expected an invalid-message error"),
    }
}

#[test]
fn id_forms() {
    let m = Message::classify(json!({"jsonrpc":"2.0","result":1,"id":"abc"}));
    match m {
        Ok(Message::Response(m)) => {
            assert_eq!(m.id, Some(RequestId::String("abc".to_string())));
        }
        _ => panic!("not classified as a response"),
    }
    let m = Message::classify(json!({"jsonrpc":"2.0","result":1,"id":2.5}));
    match m {
        Ok(Message::Response(m)) => assert_eq!(m.id, Some(RequestId::Float(2.5))),
        _ => panic!("not classified as a response"),
    }
}

#[test]
fn registry_keys() {
    assert_eq!(RequestId::Number(3).as_key(), Some(3));
    assert_eq!(RequestId::Number(-1).as_key(), None);
    assert_eq!(RequestId::Float(2.0).as_key(), Some(2));
    assert_eq!(RequestId::Float(2.5).as_key(), None);
    assert_eq!(RequestId::String("7".to_string()).as_key(), Some(7));
    assert_eq!(RequestId::String("abc".to_string()).as_key(), None);
    assert_eq!(RequestId::from(9_u64), RequestId::Number(9));
}

#[test]
fn raw_message_serializes_request() {
    let m = RawMessage {
        id: Some(RequestId::Number(1)),
        method: Some("add".to_string()),
        params: Some(json!([1, 2])),
        ..RawMessage::default()
    };
    assert_eq!(
        serde_json::to_string(&m).unwrap(),
        r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[1,2]}"#
    );
}

#[test]
fn raw_message_serializes_notification_without_id() {
    let m = RawMessage {
        method: Some("ping".to_string()),
        ..RawMessage::default()
    };
    assert_eq!(serde_json::to_string(&m).unwrap(), r#"{"jsonrpc":"2.0","method":"ping"}"#);
}

#[test]
fn raw_message_deserializes_response() {
    let m: RawMessage =
        serde_json::from_str(r#"{"jsonrpc":"2.0","result":{"ok":true},"id":1}"#).unwrap();
    assert_eq!(m.jsonrpc, "2.0");
    assert_eq!(m.id, Some(RequestId::Number(1)));
    assert_eq!(m.result, Some(json!({"ok":true})));
    assert_eq!(m.error, None);
}

#[test]
fn rebuilt_message_round_trips() {
    let m = Message::classify(json!({"jsonrpc":"2.0","method":"m","params":{"a":1},"id":4}));
    let Ok(Message::Request(m)) = m else {
        panic!("not classified as a request");
    };
    assert_eq!(
        m.into_value(),
        json!({"jsonrpc":"2.0","id":4,"method":"m","params":{"a":1}}),
    );
}
