//! XML request deserialization for Azure Blob Storage API.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ErrorCode, StorageError, StorageResult};

/// `<BlockList>` children that name a block.
const BLOCK_ELEMENTS: [&str; 3] = ["Latest", "Uncommitted", "Committed"];

/// Parsed `<BlockList>` request body of a Put Block List call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BlockListRequest {
    /// Block ids in document order, regardless of element kind. An element
    /// without text yields an empty id.
    pub block_ids: Vec<String>,
}

impl BlockListRequest {
    pub fn parse(xml: &str) -> StorageResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut result = Self::default();
        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut seen_root = false;
        // Text of the block element currently open, if any.
        let mut current: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match path.len() {
                        0 => {
                            check_root(seen_root, &name)?;
                            seen_root = true;
                        }
                        1 if is_block_element(&name) => current = Some(String::new()),
                        _ => {}
                    }
                    path.push(name);
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match path.len() {
                        0 => {
                            check_root(seen_root, &name)?;
                            seen_root = true;
                        }
                        1 if is_block_element(&name) => result.block_ids.push(String::new()),
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => {
                    if path.len() == 2 {
                        if let Some(block_id) = current.take() {
                            result.block_ids.push(block_id);
                        }
                    }
                    path.pop();
                }
                Ok(Event::Text(e)) => {
                    if let (2, Some(block_id)) = (path.len(), current.as_mut()) {
                        let text = e
                            .unescape()
                            .map_err(|e| invalid_xml(&e.to_string()))?;
                        block_id.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(invalid_xml(&e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if !seen_root || !path.is_empty() {
            return Err(invalid_xml("Incomplete BlockList document"));
        }

        Ok(result)
    }
}

fn is_block_element(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

fn check_root(seen_root: bool, name: &str) -> StorageResult<()> {
    if seen_root || name != "BlockList" {
        return Err(invalid_xml("Expected a single BlockList element"));
    }
    Ok(())
}

fn invalid_xml(detail: &str) -> StorageError {
    tracing::debug!("Rejected block list: {}", detail);
    StorageError::new(ErrorCode::InvalidXmlDocument)
}
