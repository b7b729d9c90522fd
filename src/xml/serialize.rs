//! XML response serialization for Azure Blob Storage API.

use chrono::{DateTime, Utc};

use crate::context::{format_http_date, format_iso8601};
use crate::error::xml_escape;
use crate::models::BlobItem;

/// Serializes a container listing as `EnumerationResults`.
///
/// Paging is not supported, so `Marker` and `NextMarker` are always empty
/// and `MaxResults` is zero.
pub fn serialize_blob_list(
    blobs: &[BlobItem],
    prefix: Option<&str>,
    service_endpoint: &str,
    container: &str,
) -> String {
    serialize_blob_list_at(blobs, prefix, service_endpoint, container, Utc::now())
}

fn serialize_blob_list_at(
    blobs: &[BlobItem],
    prefix: Option<&str>,
    service_endpoint: &str,
    container: &str,
    now: DateTime<Utc>,
) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    xml.push_str(&format!(
        r#"<EnumerationResults ServiceEndpoint="{}" ContainerName="{}">"#,
        xml_escape(service_endpoint),
        xml_escape(container)
    ));

    xml.push_str(&format!(
        "<Prefix>{}</Prefix>",
        xml_escape(prefix.unwrap_or(""))
    ));
    xml.push_str("<Marker></Marker>");
    xml.push_str("<MaxResults>0</MaxResults>");
    xml.push_str("<Delimiter></Delimiter>");

    xml.push_str("<Blobs>");
    for blob in blobs {
        xml.push_str(&serialize_blob(blob, &now));
    }
    xml.push_str("</Blobs>");

    xml.push_str("<NextMarker></NextMarker>");
    xml.push_str("</EnumerationResults>");
    xml
}

/// Serializes a single blob for list results. Only the name, snapshot time,
/// modification time and length carry data.
fn serialize_blob(blob: &BlobItem, now: &DateTime<Utc>) -> String {
    let props = &blob.properties;

    let mut xml = String::from("<Blob>");
    xml.push_str(&format!("<Name>{}</Name>", xml_escape(&blob.name)));
    xml.push_str(&format!(
        "<Snapshot>{}</Snapshot>",
        format_iso8601(&blob.snapshot)
    ));

    xml.push_str("<Properties>");
    xml.push_str(&format!(
        "<Last-Modified>{}</Last-Modified>",
        format_http_date(&props.last_modified)
    ));
    xml.push_str("<Etag></Etag>");
    xml.push_str("<Content-MD5></Content-MD5>");
    xml.push_str(&format!(
        "<Content-Length>{}</Content-Length>",
        props.content_length
    ));
    xml.push_str("<Content-Type></Content-Type>");
    xml.push_str("<Content-Encoding></Content-Encoding>");
    xml.push_str("<Cache-Control></Cache-Control>");
    xml.push_str("<Content-Language></Content-Language>");
    xml.push_str("<Content-Disposition></Content-Disposition>");
    xml.push_str(&format!("<BlobType>{}</BlobType>", props.blob_type.as_str()));
    xml.push_str("<x-ms-blob-sequence-number>0</x-ms-blob-sequence-number>");
    xml.push_str("<CopyId></CopyId>");
    xml.push_str("<CopyStatus></CopyStatus>");
    xml.push_str("<CopySource></CopySource>");
    xml.push_str("<CopyProgress></CopyProgress>");
    xml.push_str(&format!(
        "<CopyCompletionTime>{}</CopyCompletionTime>",
        format_http_date(now)
    ));
    xml.push_str("<CopyStatusDescription></CopyStatusDescription>");
    xml.push_str("<LeaseStatus></LeaseStatus>");
    xml.push_str("<LeaseState></LeaseState>");
    xml.push_str("<LeaseDuration></LeaseDuration>");
    xml.push_str("<ServerEncrypted>false</ServerEncrypted>");
    xml.push_str("<IncrementalCopy>false</IncrementalCopy>");
    xml.push_str("</Properties>");

    xml.push_str("<Metadata></Metadata>");
    xml.push_str("</Blob>");
    xml
}
