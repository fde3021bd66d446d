//! SOAP envelope encoding and decoding
//!
//! Requests are written as text; responses are parsed with `quick-xml` into a
//! `serde_json::Value` tree so the rest of the crate never sees XML:
//! - an element with child elements becomes an object keyed by local name
//! - a repeated child name becomes an array
//! - a leaf element becomes a string (empty elements become `""`)
//!
//! Attributes and namespace prefixes are dropped.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

use super::{collection, is_truthy, scalar_text, Fault, Params, RpcResponse};
use crate::error::{Result, SilverError};

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SESSION_HEADER_NS: &str = "SilverpopApi:EngageService.SessionHeader";

/// Service namespace for a method's body element
fn namespace_for(method: &str) -> &'static str {
    match method {
        "Login" | "Logout" => "SilverpopApi:EngageService.SessionMgmt.Login",
        "GetSentMailingsForList" | "GetSentMailingsForOrg" | "RawRecipientDataExport" => {
            "SilverpopApi:EngageService.Reporting"
        }
        _ => "SilverpopApi:EngageService.ListMgmt.UserActions",
    }
}

/// Build the request envelope for `method`
pub fn encode_request(method: &str, params: &Params, session: Option<&str>) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(&format!(r#"<soapenv:Envelope xmlns:soapenv="{}">"#, SOAP_ENV_NS));

    xml.push_str("<soapenv:Header>");
    if let Some(token) = session {
        xml.push_str(&format!(
            r#"<ses:sessionHeader xmlns:ses="{}"><ses:sessionid>{}</ses:sessionid></ses:sessionHeader>"#,
            SESSION_HEADER_NS,
            escape(token)
        ));
    }
    xml.push_str("</soapenv:Header>");

    xml.push_str("<soapenv:Body>");
    xml.push_str(&format!(r#"<{} xmlns="{}">"#, method, namespace_for(method)));
    for (name, value) in params {
        write_element(&mut xml, name, value);
    }
    xml.push_str(&format!("</{}>", method));
    xml.push_str("</soapenv:Body></soapenv:Envelope>");
    xml
}

fn write_element(xml: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                write_element(xml, name, item);
            }
        }
        Value::Object(children) => {
            xml.push_str(&format!("<{}>", name));
            for (child, v) in children {
                write_element(xml, child, v);
            }
            xml.push_str(&format!("</{}>", name));
        }
        Value::String(s) => xml.push_str(&format!("<{0}>{1}</{0}>", name, escape(s.as_str()))),
        Value::Bool(b) => xml.push_str(&format!("<{0}>{1}</{0}>", name, b)),
        Value::Number(n) => xml.push_str(&format!("<{0}>{1}</{0}>", name, n)),
    }
}

/// Element under construction
struct Node {
    name: String,
    text: String,
    children: Map<String, Value>,
    has_children: bool,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Map::new(),
            has_children: false,
        }
    }

    fn into_value(self) -> Value {
        if self.has_children {
            Value::Object(self.children)
        } else {
            Value::String(self.text.trim().to_string())
        }
    }

    fn add_child(&mut self, name: String, value: Value) {
        self.has_children = true;
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }
}

/// Parse an XML document into its root element name and value tree
pub fn parse_document(xml: &str) -> Result<(String, Value)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(Node::new(name));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let value = Value::String(String::new());
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Text(t) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    SilverError::Transport("Malformed envelope: unbalanced end tag".to_string())
                })?;
                let name = node.name.clone();
                let value = node.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SilverError::Transport(
            "Malformed envelope: unexpected end of document".to_string(),
        ));
    }
    root.ok_or_else(|| SilverError::Transport("Malformed envelope: empty document".to_string()))
}

/// Case-insensitive field lookup; fault elements vary in case between
/// the SOAP layer and the service's own result bodies.
fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

fn read_fault(fault: &Value) -> Fault {
    let error_id = field(fault, "detail")
        .and_then(|d| field(d, "error"))
        .and_then(|e| collection(Some(e)).into_iter().next())
        .and_then(|e| field(&e, "errorid").and_then(scalar_text));
    let code = error_id
        .or_else(|| field(fault, "faultcode").and_then(scalar_text))
        .unwrap_or_default();
    let detail = field(fault, "faultstring")
        .and_then(scalar_text)
        .unwrap_or_else(|| fault.to_string());
    Fault::new(code, detail)
}

/// Decode a response envelope
pub fn decode_response(xml: &str) -> Result<RpcResponse> {
    let (root, tree) = parse_document(xml)?;
    if !root.eq_ignore_ascii_case("Envelope") {
        return Err(SilverError::Transport(format!(
            "Malformed envelope: unexpected root element {}",
            root
        )));
    }
    let body = field(&tree, "Body")
        .ok_or_else(|| SilverError::Transport("Malformed envelope: no Body".to_string()))?;

    if let Some(fault) = field(body, "Fault") {
        return Ok(RpcResponse {
            success: false,
            payload: fault.clone(),
            fault: Some(read_fault(fault)),
        });
    }

    let payload = body
        .as_object()
        .and_then(|children| children.values().next())
        .cloned()
        .unwrap_or(Value::Null);
    let success = field(&payload, "SUCCESS").is_some_and(is_truthy);
    let fault = if success {
        None
    } else {
        field(&payload, "Fault").map(read_fault)
    };

    Ok(RpcResponse {
        success,
        payload,
        fault,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_encode_login_has_no_session_header() {
        let xml = encode_request(
            "Login",
            &params(json!({"USERNAME": "user@example.com", "PASSWORD": "p<ss"})),
            None,
        );
        assert!(!xml.contains("sessionid"));
        assert!(xml.contains("<USERNAME>user@example.com</USERNAME>"));
        assert!(xml.contains("<PASSWORD>p&lt;ss</PASSWORD>"));
        assert!(xml.contains("SilverpopApi:EngageService.SessionMgmt.Login"));
    }

    #[test]
    fn test_encode_carries_token_and_scalars() {
        let xml = encode_request(
            "GetLists",
            &params(json!({"VISIBILITY": 1, "INCLUDE_ALL_LISTS": true, "SKIP": null})),
            Some("ABC123"),
        );
        assert!(xml.contains("<ses:sessionid>ABC123</ses:sessionid>"));
        assert!(xml.contains("<VISIBILITY>1</VISIBILITY>"));
        assert!(xml.contains("<INCLUDE_ALL_LISTS>true</INCLUDE_ALL_LISTS>"));
        assert!(!xml.contains("SKIP"));
    }

    #[test]
    fn test_decode_success_with_repeated_elements() {
        let xml = r#"<?xml version="1.0"?>
            <SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
              <SOAP-ENV:Body>
                <RESULT>
                  <SUCCESS>TRUE</SUCCESS>
                  <LIST><ID>1</ID><NAME>Root</NAME></LIST>
                  <LIST><ID>2</ID><NAME>A &amp; B</NAME></LIST>
                  <EMPTY/>
                </RESULT>
              </SOAP-ENV:Body>
            </SOAP-ENV:Envelope>"#;
        let response = decode_response(xml).unwrap();
        assert!(response.success);
        assert!(response.fault.is_none());
        assert_eq!(response.payload["LIST"][1]["NAME"], json!("A & B"));
        assert_eq!(response.payload["EMPTY"], json!(""));
    }

    #[test]
    fn test_decode_soap_fault_with_error_id() {
        let xml = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
              <SOAP-ENV:Body>
                <SOAP-ENV:Fault>
                  <faultcode>SOAP-ENV:Client</faultcode>
                  <faultstring>Session has expired or is invalid</faultstring>
                  <detail><error><errorid>145</errorid><module/></error></detail>
                </SOAP-ENV:Fault>
              </SOAP-ENV:Body>
            </SOAP-ENV:Envelope>"#;
        let response = decode_response(xml).unwrap();
        assert!(!response.success);
        let fault = response.fault.unwrap();
        assert_eq!(fault.code, "145");
        assert_eq!(fault.detail, "Session has expired or is invalid");
    }

    #[test]
    fn test_decode_result_level_fault() {
        let xml = r#"<Envelope><Body><RESULT>
                <SUCCESS>false</SUCCESS>
                <Fault><FaultString>List not found</FaultString>
                  <detail><error><errorid>256</errorid></error></detail></Fault>
            </RESULT></Body></Envelope>"#;
        let response = decode_response(xml).unwrap();
        assert!(!response.success);
        assert_eq!(response.fault, Some(Fault::new("256", "List not found")));
    }

    #[test]
    fn test_decode_rejects_non_envelope() {
        assert!(decode_response("<html><body>502</body></html>").is_err());
        assert!(decode_response("<Envelope><Body>").is_err());
    }
}
