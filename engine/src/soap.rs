//! Blocking SOAP client for the library's `versions.asmx` and `copy.asmx`
//! web services.
//!
//! Requests are hand-built envelopes; responses are read with a pull parser
//! that only looks at the few elements the engine needs.

use crate::error::RemoteError;
use crate::model::{CopyOutcome, CopyResult, Credentials, FieldDescriptor, VersionInfo};
use crate::paths::combine_urls;
use crate::remote::LibraryClient;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use uuid::Uuid;

const VERSIONS_HANDLER: &str = "_vti_bin/versions.asmx";
const COPY_HANDLER: &str = "_vti_bin/copy.asmx";
const SOAP_NAMESPACE: &str = "http://schemas.microsoft.com/sharepoint/soap/";
const GET_VERSIONS_ACTION: &str = "http://schemas.microsoft.com/sharepoint/soap/GetVersions";
const COPY_INTO_ITEMS_ACTION: &str = "http://schemas.microsoft.com/sharepoint/soap/CopyIntoItems";

/// Longest response body kept in a `RemoteError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// `LibraryClient` over HTTP + SOAP.
///
/// Explicit credentials are sent as HTTP Basic authorization. Without them
/// no authorization header is sent.
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: Client,
}

impl SoapClient {
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .user_agent(concat!("libupload/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(SoapClient { http })
    }

    fn post(
        &self,
        url: &str,
        action: &str,
        body: String,
        credentials: Option<&Credentials>,
    ) -> Result<String, RemoteError> {
        log::debug!("POST {} ({})", url, action);
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}\"", action))
            .body(body);
        if let Some(credentials) = credentials {
            request = request.basic_auth(credentials.username(), Some(credentials.password()));
        }

        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            if let Some(fault) = parse_fault(&text) {
                return Err(RemoteError::Fault(fault));
            }
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        Ok(text)
    }
}

impl LibraryClient for SoapClient {
    fn get_versions(
        &self,
        site_url: &str,
        file_name: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<VersionInfo>, RemoteError> {
        let url = combine_urls(site_url, VERSIONS_HANDLER);
        let response = self.post(&url, GET_VERSIONS_ACTION, get_versions_envelope(file_name), credentials)?;
        parse_versions_response(&response)
    }

    fn copy_into_items(
        &self,
        site_url: &str,
        payload: &[u8],
        destinations: &[String],
        fields: &[FieldDescriptor],
        credentials: Option<&Credentials>,
    ) -> Result<CopyOutcome, RemoteError> {
        let url = combine_urls(site_url, COPY_HANDLER);
        let source_url = destinations.first().map(String::as_str).unwrap_or_default();
        let body = copy_into_items_envelope(source_url, destinations, fields, payload);
        let response = self.post(&url, COPY_INTO_ITEMS_ACTION, body, credentials)?;
        parse_copy_response(&response)
    }
}

fn envelope(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
            r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
            r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<soap:Body>{}</soap:Body></soap:Envelope>"
        ),
        body
    )
}

pub(crate) fn get_versions_envelope(file_name: &str) -> String {
    envelope(&format!(
        r#"<GetVersions xmlns="{}"><fileName>{}</fileName></GetVersions>"#,
        SOAP_NAMESPACE,
        escape(file_name)
    ))
}

pub(crate) fn copy_into_items_envelope(
    source_url: &str,
    destinations: &[String],
    fields: &[FieldDescriptor],
    payload: &[u8],
) -> String {
    let mut body = format!(
        r#"<CopyIntoItems xmlns="{}"><SourceUrl>{}</SourceUrl><DestinationUrls>"#,
        SOAP_NAMESPACE,
        escape(source_url)
    );
    for destination in destinations {
        body.push_str(&format!("<string>{}</string>", escape(destination.as_str())));
    }
    body.push_str("</DestinationUrls><Fields>");
    for field in fields {
        body.push_str(&format!(
            r#"<FieldInformation Type="{}" DisplayName="{}" InternalName="{}" Id="{}" Value="{}" />"#,
            field.field_type,
            escape(field.display_name.as_str()),
            escape(field.display_name.as_str()),
            Uuid::nil(),
            escape(field.value.as_str())
        ));
    }
    body.push_str(&format!(
        "</Fields><Stream>{}</Stream></CopyIntoItems>",
        STANDARD.encode(payload)
    ));
    envelope(&body)
}

/// Map a `CopyErrorCode` name (or number) to its numeric value.
fn copy_error_code(raw: &str) -> u32 {
    match raw {
        "Success" => 0,
        "DestinationInvalid" => 1,
        "DestinationMWS" => 2,
        "SourceInvalid" => 3,
        "DestinationCheckedOut" => 4,
        "InvalidUrl" => 5,
        other => other.parse().unwrap_or(6),
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, RemoteError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| RemoteError::Protocol(e.to_string()))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn copy_result_from(element: &BytesStart<'_>) -> Result<CopyResult, RemoteError> {
    let code = attribute(element, "ErrorCode")?.unwrap_or_default();
    Ok(CopyResult {
        error_code: copy_error_code(&code),
        error_message: attribute(element, "ErrorMessage")?.unwrap_or_default(),
        destination_url: attribute(element, "DestinationUrl")?.unwrap_or_default(),
    })
}

pub(crate) fn parse_copy_response(xml: &str) -> Result<CopyOutcome, RemoteError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_return_code = false;
    let mut return_code = None;
    let mut results = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"CopyIntoItemsResult" => {
                in_return_code = true;
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"CopyResult" => {
                results.push(copy_result_from(&e)?);
            }
            Event::Text(t) if in_return_code => {
                let text = t.unescape()?;
                let code = text
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| RemoteError::Protocol(format!("invalid return code '{}'", text)))?;
                return_code = Some(code);
            }
            Event::End(e) if e.local_name().as_ref() == b"CopyIntoItemsResult" => {
                in_return_code = false;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let return_code = return_code
        .ok_or_else(|| RemoteError::Protocol("missing CopyIntoItemsResult".to_string()))?;
    Ok(CopyOutcome { return_code, results })
}

pub(crate) fn parse_versions_response(xml: &str) -> Result<Vec<VersionInfo>, RemoteError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut seen_response = false;
    let mut versions = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"GetVersionsResponse" | b"GetVersionsResult" => seen_response = true,
                b"result" => versions.push(VersionInfo {
                    version: attribute(&e, "version")?.unwrap_or_default(),
                    url: attribute(&e, "url")?.unwrap_or_default(),
                    created: attribute(&e, "created")?.unwrap_or_default(),
                    size: attribute(&e, "size")?.and_then(|s| s.parse().ok()),
                }),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_response {
        return Err(RemoteError::Protocol("missing GetVersionsResponse".to_string()));
    }
    Ok(versions)
}

/// Extract `faultstring` from a SOAP fault body, if there is one.
pub(crate) fn parse_fault(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_fault_string = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"faultstring" => in_fault_string = true,
            Ok(Event::Text(t)) if in_fault_string => {
                return t.unescape().ok().map(|s| s.into_owned());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"faultstring" => {
                return Some(String::new());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
