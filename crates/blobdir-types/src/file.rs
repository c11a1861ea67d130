use serde::{Deserialize, Serialize};

/// Last-modification time of a stored file in milliseconds since the UNIX
/// epoch. Doubles as the optimistic-concurrency token; `0` means unset.
pub type Version = u64;

/// What a read should return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    /// Name and version only; the content is not read.
    MetadataOnly,
    /// Name, version, and the full content.
    #[default]
    WithContent,
}

impl ReadMode {
    /// Returns `true` if the content should be loaded.
    pub fn wants_content(&self) -> bool {
        matches!(self, Self::WithContent)
    }
}

/// A named byte payload managed by the store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Filename including its extension.
    pub name: String,
    /// File bytes; `None` when only metadata was requested.
    #[serde(default, with = "base64_content", skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
    /// Modification time, used for concurrency control on update.
    #[serde(default, rename = "lastModified")]
    pub version: Version,
}

impl StoredFile {
    /// A new file carrying content, with no version yet.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: Some(content.into()),
            version: 0,
        }
    }

    /// Metadata-only view of a file.
    pub fn metadata(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            content: None,
            version,
        }
    }

    /// Returns `true` if content is present and non-empty.
    pub fn has_content(&self) -> bool {
        self.content.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Content length in bytes, zero when absent.
    pub fn size(&self) -> u64 {
        self.content.as_ref().map_or(0, |c| c.len() as u64)
    }
}

// Content is deliberately left out of `Debug`; it can be large.
impl std::fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredFile")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("version", &self.version)
            .finish()
    }
}

/// Requested changes to an existing file.
///
/// At least one of `name` and `content` must be set, and `version` must carry
/// the modification time the caller last observed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    /// New filename, if the file should be renamed.
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement content.
    #[serde(default, with = "base64_content")]
    pub content: Option<Vec<u8>>,
    /// Expected current version.
    #[serde(default, rename = "lastModified")]
    pub version: Option<Version>,
}

impl FilePatch {
    /// A patch that renames the file.
    pub fn rename(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: Some(name.into()),
            content: None,
            version: Some(version),
        }
    }

    /// A patch that replaces the content.
    pub fn replace_content(content: impl Into<Vec<u8>>, version: Version) -> Self {
        Self {
            name: None,
            content: Some(content.into()),
            version: Some(version),
        }
    }

    /// Add a rename to this patch.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a content replacement to this patch.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Returns `true` if the patch changes neither name nor content.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none()
    }

    /// The expected version, treating `0` the same as absent.
    pub fn expected_version(&self) -> Option<Version> {
        self.version.filter(|v| *v != 0)
    }
}

/// Base64 encoding for optional byte payloads on the JSON wire.
mod base64_content {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
