//! Blocking REST client for the document backend.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::model::{CompanySetting, Customer, DocumentKind, Product};
use crate::record::{extract_record, extract_records};

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(headers).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, method: &str, path: &str, request: RequestBuilder) -> AppResult<Value> {
        let url = self.url(path);
        debug!(method, %url, "api request");
        let response = request.send().map_err(|e| {
            error!(method, %url, error = %e, "api request failed");
            AppError::from(e)
        })?;
        read_body(method, &url, response)
    }

    fn get_json(&self, path: &str) -> AppResult<Value> {
        self.send("GET", path, self.client.get(self.url(path)))
    }

    // ------------------------------------------
    // Documents
    // ------------------------------------------

    pub fn list(&self, kind: DocumentKind) -> AppResult<Vec<Value>> {
        extract_records(self.get_json(kind.resource())?)
    }

    pub fn get(&self, kind: DocumentKind, id: u64) -> AppResult<Value> {
        extract_record(self.get_json(&format!("{}/{}", kind.resource(), id))?)
    }

    pub fn create(&self, kind: DocumentKind, body: &Value) -> AppResult<Value> {
        let path = kind.resource();
        let body = self.send("POST", path, self.client.post(self.url(path)).json(body))?;
        extract_record(body)
    }

    pub fn update(&self, kind: DocumentKind, id: u64, body: &Value) -> AppResult<Value> {
        let path = format!("{}/{}", kind.resource(), id);
        let body = self.send("PUT", &path, self.client.put(self.url(&path)).json(body))?;
        extract_record(body)
    }

    pub fn delete(&self, kind: DocumentKind, id: u64) -> AppResult<()> {
        let path = format!("{}/{}", kind.resource(), id);
        self.send("DELETE", &path, self.client.delete(self.url(&path)))?;
        Ok(())
    }

    pub fn patch_status(&self, kind: DocumentKind, id: u64, status: &str) -> AppResult<()> {
        let path = format!("{}/{}/status", kind.resource(), id);
        let request = self.client.patch(self.url(&path)).json(&json!({ "status": status }));
        self.send("PATCH", &path, request)?;
        Ok(())
    }

    /// Returns the server's confirmation message.
    pub fn send_email(&self, kind: DocumentKind, id: u64, email: &str) -> AppResult<String> {
        let path = format!("{}/{}/send-email", kind.resource(), id);
        let request = self.client.post(self.url(&path)).json(&json!({ "email": email }));
        let body = self.send("POST", &path, request)?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("ส่งอีเมลสำเร็จ")
            .to_string())
    }

    // ------------------------------------------
    // Reference data
    // ------------------------------------------

    pub fn customers(&self) -> AppResult<Vec<Customer>> {
        decode_all(self.list_path("customers")?)
    }

    pub fn active_customers(&self) -> AppResult<Vec<Customer>> {
        Ok(self.customers()?.into_iter().filter(Customer::is_active).collect())
    }

    pub fn products(&self) -> AppResult<Vec<Product>> {
        decode_all(self.list_path("products")?)
    }

    pub fn company_setting(&self) -> AppResult<CompanySetting> {
        let body = extract_record(self.get_json("company-settings")?)?;
        Ok(serde_json::from_value(body)?)
    }

    pub fn update_company_setting(&self, setting: &CompanySetting) -> AppResult<CompanySetting> {
        let path = "company-settings";
        let body = self.send("PUT", path, self.client.put(self.url(path)).json(setting))?;
        Ok(serde_json::from_value(extract_record(body)?)?)
    }

    fn list_path(&self, path: &str) -> AppResult<Vec<Value>> {
        extract_records(self.get_json(path)?)
    }
}

fn read_body(method: &str, url: &str, response: Response) -> AppResult<Value> {
    let status = response.status();
    let text = response.text()?;
    let body = parse_body(&text);

    if status.is_success() {
        debug!(method, %url, status = status.as_u16(), "api response");
        return Ok(body);
    }

    let message = api_error_message(&body);
    error!(method, %url, status = status.as_u16(), %message, "api returned an error");
    Err(AppError::Api {
        status: status.as_u16(),
        message: if message.is_empty() { default_message(status) } else { message },
    })
}

/// Empty bodies (204 on delete) read as `null`; non-JSON text is kept as a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn default_message(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// Laravel validation errors (`{"errors": {"field": ["msg"]}}`) are flattened into
/// `"msg1, msg2"`; otherwise the `message` field is used.
pub fn api_error_message(body: &Value) -> String {
    if let Some(errors) = body.get("errors").and_then(Value::as_object) {
        let messages: Vec<&str> = errors
            .values()
            .flat_map(|v| match v {
                Value::Array(list) => list.iter().filter_map(Value::as_str).collect::<Vec<&str>>(),
                Value::String(s) => vec![s.as_str()],
                _ => Vec::new(),
            })
            .collect();
        if !messages.is_empty() {
            return messages.join(", ");
        }
    }
    match body {
        Value::String(s) => s.trim().to_string(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn decode_all<T: DeserializeOwned>(records: Vec<Value>) -> AppResult<Vec<T>> {
    records
        .into_iter()
        .map(|r| serde_json::from_value(r).map_err(AppError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn validation_errors_are_flattened() {
        let body = json!({
            "message": "The given data was invalid.",
            "errors": {
                "invoice_no": ["The invoice no has already been taken."],
                "customer_name": ["The customer name field is required."]
            }
        });
        let message = api_error_message(&body);
        assert!(message.contains("The invoice no has already been taken."));
        assert!(message.contains(", "));
        assert!(!message.contains("given data"));
    }

    #[test]
    fn falls_back_to_message_field() {
        assert_eq!(api_error_message(&json!({"message": "Not found"})), "Not found");
        assert_eq!(api_error_message(&json!({"errors": {}, "message": "x"})), "x");
        assert_eq!(api_error_message(&json!(null)), "");
        assert_eq!(api_error_message(&json!("Server Error ")), "Server Error");
    }

    #[test]
    fn bodies_parse_leniently() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"id\":1}")["id"], 1);
        assert_eq!(parse_body("<html>"), Value::String("<html>".into()));
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let client = ApiClient::new("http://127.0.0.1:8000/api/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000/api");
        assert_eq!(client.url("/invoices/3"), "http://127.0.0.1:8000/api/invoices/3");
    }

    #[test]
    fn reference_records_decode() {
        let customers: Vec<Customer> = decode_all(vec![
            json!({"id": 1, "code": "C001", "name": "บริษัท ABC จำกัด", "status": "active"}),
            json!({"id": "2", "code": "C002", "name": "ร้าน DEF", "status": "inactive"}),
        ])
        .unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers.iter().filter(|c| c.is_active()).count(), 1);
    }

    // ------------------------------------------
    // Against a local stub server
    // ------------------------------------------

    fn client_for(server: &Server) -> ApiClient {
        ApiClient::new(&server.url()).unwrap()
    }

    #[test]
    fn status_change_patches_the_status_path() {
        let mut server = Server::new();
        let mock = server
            .mock("PATCH", "/invoices/3/status")
            .match_header("content-type", "application/json")
            .match_header("accept", "application/json")
            .match_body(Matcher::Json(json!({ "status": "paid" })))
            .with_status(200)
            .with_body(r#"{"message":"updated"}"#)
            .create();

        client_for(&server).patch_status(DocumentKind::Invoice, 3, "paid").unwrap();
        mock.assert();
    }

    #[test]
    fn send_email_posts_the_address_and_returns_the_server_message() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/quotations/5/send-email")
            .match_body(Matcher::Json(json!({ "email": "buyer@example.com" })))
            .with_status(200)
            .with_body(r#"{"message":"ส่งใบเสนอราคาแล้ว"}"#)
            .create();
        let client = client_for(&server);

        let message = client.send_email(DocumentKind::Quotation, 5, "buyer@example.com").unwrap();
        assert_eq!(message, "ส่งใบเสนอราคาแล้ว");
        mock.assert();

        server
            .mock("POST", "/receipts/6/send-email")
            .with_status(200)
            .with_body("")
            .create();
        assert_eq!(client.send_email(DocumentKind::Receipt, 6, "a@b.co").unwrap(), "ส่งอีเมลสำเร็จ");
    }

    #[test]
    fn create_and_update_unwrap_the_data_envelope() {
        let mut server = Server::new();
        let created = server
            .mock("POST", "/purchase-orders")
            .match_body(Matcher::PartialJson(json!({ "po_number": "PO20250001" })))
            .with_status(201)
            .with_body(r#"{"message":"created","data":{"id":9,"po_number":"PO20250001"}}"#)
            .create();
        let updated = server
            .mock("PUT", "/receipts/4")
            .with_status(200)
            .with_body(r#"{"id":4,"receipt_no":"REC20250004"}"#)
            .create();
        let client = client_for(&server);

        let record = client
            .create(DocumentKind::PurchaseOrder, &json!({ "po_number": "PO20250001" }))
            .unwrap();
        assert_eq!(record["id"], 9);
        assert!(record.get("message").is_none());

        let record = client.update(DocumentKind::Receipt, 4, &json!({})).unwrap();
        assert_eq!(record["receipt_no"], "REC20250004");
        created.assert();
        updated.assert();
    }

    #[test]
    fn list_and_get_accept_both_response_shapes() {
        let mut server = Server::new();
        server
            .mock("GET", "/withholding-taxes")
            .with_status(200)
            .with_body(r#"{"data":[{"id":1},{"id":2}]}"#)
            .create();
        server
            .mock("GET", "/invoices")
            .with_status(200)
            .with_body(r#"[{"id":7}]"#)
            .create();
        server
            .mock("GET", "/invoices/7")
            .with_status(200)
            .with_body(r#"{"data":{"id":7,"invoice_no":"INV20250007"}}"#)
            .create();
        let client = client_for(&server);

        assert_eq!(client.list(DocumentKind::WithholdingTax).unwrap().len(), 2);
        assert_eq!(client.list(DocumentKind::Invoice).unwrap().len(), 1);
        assert_eq!(client.get(DocumentKind::Invoice, 7).unwrap()["invoice_no"], "INV20250007");
    }

    #[test]
    fn delete_accepts_an_empty_no_content_reply() {
        let mut server = Server::new();
        let mock = server
            .mock("DELETE", "/withholding-taxes/2")
            .with_status(204)
            .create();

        client_for(&server).delete(DocumentKind::WithholdingTax, 2).unwrap();
        mock.assert();
    }

    #[test]
    fn validation_failure_maps_to_api_error_with_flattened_messages() {
        let mut server = Server::new();
        server
            .mock("POST", "/invoices")
            .with_status(422)
            .with_body(
                r#"{"message":"The given data was invalid.","errors":{"customer_name":["a"],"items":["b"]}}"#,
            )
            .create();

        let err = client_for(&server).create(DocumentKind::Invoice, &json!({})).unwrap_err();
        match err {
            AppError::Api { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "a, b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn server_error_without_body_uses_the_status_reason() {
        let mut server = Server::new();
        server.mock("GET", "/quotations/1").with_status(500).create();

        let err = client_for(&server).get(DocumentKind::Quotation, 1).unwrap_err();
        assert!(matches!(
            err,
            AppError::Api { status: 500, ref message } if message == "Internal Server Error"
        ));
    }

    #[test]
    fn reference_data_endpoints() {
        let mut server = Server::new();
        server
            .mock("GET", "/customers")
            .with_status(200)
            .with_body(r#"{"data":[{"id":1,"name":"A","status":"active"},{"id":2,"name":"B","status":"inactive"}]}"#)
            .create();
        server
            .mock("GET", "/company-settings")
            .with_status(200)
            .with_body(r#"{"data":{"company_name":"บริษัท ทดสอบ จำกัด","tax_id":"0105551234567"}}"#)
            .create();
        let saved = server
            .mock("PUT", "/company-settings")
            .match_body(Matcher::PartialJson(json!({ "company_name": "ใหม่" })))
            .with_status(200)
            .with_body(r#"{"data":{"company_name":"ใหม่"}}"#)
            .create();
        let client = client_for(&server);

        assert_eq!(client.active_customers().unwrap().len(), 1);
        let setting = client.company_setting().unwrap();
        assert_eq!(setting.company_name.as_deref(), Some("บริษัท ทดสอบ จำกัด"));

        let update = CompanySetting { company_name: Some("ใหม่".into()), ..setting };
        let stored = client.update_company_setting(&update).unwrap();
        assert_eq!(stored.company_name.as_deref(), Some("ใหม่"));
        saved.assert();
    }
}
