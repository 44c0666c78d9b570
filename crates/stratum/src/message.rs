use super::*;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Clone)]
#[serde(untagged)]
pub enum Id {
    Null,
    Number(u64),
    String(String),
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum Message {
    Request {
        id: Id,
        method: String,
        params: Value,
    },
    Response {
        id: Id,
        result: Option<Value>,
        error: Option<JsonRpcError>,
    },
    Notification {
        id: Id,
        method: String,
        params: Value,
    },
}

impl Message {
    pub fn notification(method: &str, params: Value) -> Self {
        Self::Notification {
            id: Id::Null,
            method: method.into(),
            params,
        }
    }
}

/// Server pushes carry `id: null`, which JSON-RPC would call a request. Anything with a method
/// and a null or missing id is read as a notification; a method with a real id is a request.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        let has_method = value.get("method").is_some();

        let null_id = value.get("id").is_none() || value.get("id") == Some(&Value::Null);

        let is_response = !has_method && (value.get("result").is_some() || value.get("error").is_some());

        if is_response {
            #[derive(Deserialize)]
            struct Resp {
                id: Id,
                result: Option<Value>,
                error: Option<JsonRpcError>,
            }

            let r: Resp = serde_json::from_value(value).map_err(de::Error::custom)?;

            Ok(Message::Response {
                id: r.id,
                result: r.result,
                error: r.error,
            })
        } else if has_method && null_id {
            let method = value
                .get("method")
                .and_then(Value::as_str)
                .ok_or_else(|| de::Error::custom("method must be a string"))?
                .to_string();

            let params = value.get("params").cloned().unwrap_or(Value::Null);

            Ok(Message::Notification {
                id: Id::Null,
                method,
                params,
            })
        } else if has_method {
            #[derive(Deserialize)]
            struct Req {
                id: Id,
                method: String,
                #[serde(default)]
                params: Value,
            }

            let r: Req = serde_json::from_value(value).map_err(de::Error::custom)?;

            Ok(Message::Request {
                id: r.id,
                method: r.method,
                params: r.params,
            })
        } else {
            Err(de::Error::custom("unknown message format"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn case(s: &str, expected: Message) {
        let actual = serde_json::from_str::<Message>(s).unwrap();
        assert_eq!(actual, expected, "deserialize Message from str");

        let serialized = serde_json::to_string(&actual).unwrap();
        let lhs: Value = serde_json::from_str(s).unwrap();
        let rhs: Value = serde_json::from_str(&serialized).unwrap();
        assert_eq!(lhs, rhs, "JSON semantic equality");
    }

    #[test]
    fn request() {
        case(
            r#"{"id":1,"method":"mining.subscribe","params":["mtpminer/1.0"]}"#,
            Message::Request {
                id: Id::Number(1),
                method: "mining.subscribe".into(),
                params: json!(["mtpminer/1.0"]),
            },
        );
    }

    #[test]
    fn request_with_string_id() {
        case(
            r#"{"id":"a","method":"mining.authorize","params":["addr.rig",""]}"#,
            Message::Request {
                id: Id::String("a".into()),
                method: "mining.authorize".into(),
                params: json!(["addr.rig", ""]),
            },
        );
    }

    #[test]
    fn request_without_params() {
        assert_eq!(
            serde_json::from_str::<Message>(r#"{"id":3,"method":"mining.subscribe"}"#).unwrap(),
            Message::Request {
                id: Id::Number(3),
                method: "mining.subscribe".into(),
                params: Value::Null,
            }
        );
    }

    #[test]
    fn notification() {
        case(
            r#"{"id":null,"method":"mining.set_target","params":["00ff"]}"#,
            Message::notification("mining.set_target", json!(["00ff"])),
        );

        assert_eq!(
            serde_json::from_str::<Message>(r#"{"method":"mining.notify","params":[]}"#).unwrap(),
            Message::notification("mining.notify", json!([])),
        );
    }

    #[test]
    fn response() {
        case(
            r#"{"id":4,"result":true,"error":null}"#,
            Message::Response {
                id: Id::Number(4),
                result: Some(json!(true)),
                error: None,
            },
        );
    }

    #[test]
    fn error_response() {
        case(
            r#"{"id":10,"result":false,"error":[21,"Stale share - Job not found",null]}"#,
            Message::Response {
                id: Id::Number(10),
                result: Some(json!(false)),
                error: Some(StratumError::Stale.into_response()),
            },
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"foo":1}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"[1,2,3]"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{"id":1,"method":7}"#).is_err());
    }
}
