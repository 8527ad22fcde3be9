//! Assets: the closed set of values a content store can hold

use crate::error::AssetError;
use crate::hash::{checksum_of, Checksum};
use crate::model::{
    AnalyzerReference, CompilationOptions, DocumentAttributes, FrozenDocumentIdentity,
    MetadataReference, ParseOptions, ProjectAttributes, ProjectReference, SolutionAttributes,
    SourceText,
};
use crate::tree::{DocumentChecksums, ProjectChecksums, SolutionChecksums};
use serde::{Deserialize, Serialize};

/// Discriminates asset values; doubles as the checksum domain tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AssetKind {
    SolutionChecksums = 1,
    ProjectChecksums = 2,
    DocumentChecksums = 3,
    SolutionAttributes = 4,
    ProjectAttributes = 5,
    DocumentAttributes = 6,
    CompilationOptions = 7,
    ParseOptions = 8,
    ProjectReference = 9,
    MetadataReference = 10,
    AnalyzerReference = 11,
    Text = 12,
    FrozenDocumentIdentity = 13,
}

impl AssetKind {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Any value addressable by checksum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    SolutionChecksums(SolutionChecksums),
    ProjectChecksums(ProjectChecksums),
    DocumentChecksums(DocumentChecksums),
    SolutionAttributes(SolutionAttributes),
    ProjectAttributes(ProjectAttributes),
    DocumentAttributes(DocumentAttributes),
    CompilationOptions(CompilationOptions),
    ParseOptions(ParseOptions),
    ProjectReference(ProjectReference),
    MetadataReference(MetadataReference),
    AnalyzerReference(AnalyzerReference),
    Text(SourceText),
    FrozenDocumentIdentity(FrozenDocumentIdentity),
}

/// Typed view over one `Asset` variant
pub trait AssetValue: Clone + Sized + Send + Sync + 'static {
    const KIND: AssetKind;

    fn into_asset(self) -> Asset;

    fn from_asset(asset: Asset) -> Option<Self>;

    fn from_asset_ref(asset: &Asset) -> Option<&Self>;

    /// Content checksum of this value
    fn checksum(&self) -> Checksum;
}

macro_rules! asset_values {
    (nodes: $($node:ident),* ; values: $($value:ident),* $(,)?) => {
        $(
            impl AssetValue for $node {
                const KIND: AssetKind = AssetKind::$node;

                fn into_asset(self) -> Asset {
                    Asset::$node(self)
                }

                fn from_asset(asset: Asset) -> Option<Self> {
                    match asset {
                        Asset::$node(value) => Some(value),
                        _ => None,
                    }
                }

                fn from_asset_ref(asset: &Asset) -> Option<&Self> {
                    match asset {
                        Asset::$node(value) => Some(value),
                        _ => None,
                    }
                }

                fn checksum(&self) -> Checksum {
                    self.compute_checksum()
                }
            }
        )*
        $(
            impl AssetValue for $value {
                const KIND: AssetKind = AssetKind::$value;

                fn into_asset(self) -> Asset {
                    Asset::$value(self)
                }

                fn from_asset(asset: Asset) -> Option<Self> {
                    match asset {
                        Asset::$value(value) => Some(value),
                        _ => None,
                    }
                }

                fn from_asset_ref(asset: &Asset) -> Option<&Self> {
                    match asset {
                        Asset::$value(value) => Some(value),
                        _ => None,
                    }
                }

                fn checksum(&self) -> Checksum {
                    checksum_of(Self::KIND.tag(), self)
                }
            }
        )*

        impl Asset {
            pub fn kind(&self) -> AssetKind {
                match self {
                    $(Asset::$node(_) => AssetKind::$node,)*
                    $(Asset::$value(_) => AssetKind::$value,)*
                    Asset::Text(_) => AssetKind::Text,
                }
            }

            /// Recompute this asset's checksum from its content
            pub fn checksum(&self) -> Checksum {
                match self {
                    $(Asset::$node(value) => value.checksum(),)*
                    $(Asset::$value(value) => value.checksum(),)*
                    Asset::Text(value) => value.checksum(),
                }
            }
        }
    };
}

asset_values!(
    nodes: SolutionChecksums, ProjectChecksums, DocumentChecksums;
    values: SolutionAttributes, ProjectAttributes, DocumentAttributes, CompilationOptions,
        ParseOptions, ProjectReference, MetadataReference, AnalyzerReference,
        FrozenDocumentIdentity,
);

impl AssetValue for SourceText {
    const KIND: AssetKind = AssetKind::Text;

    fn into_asset(self) -> Asset {
        Asset::Text(self)
    }

    fn from_asset(asset: Asset) -> Option<Self> {
        match asset {
            Asset::Text(text) => Some(text),
            _ => None,
        }
    }

    fn from_asset_ref(asset: &Asset) -> Option<&Self> {
        match asset {
            Asset::Text(text) => Some(text),
            _ => None,
        }
    }

    fn checksum(&self) -> Checksum {
        checksum_of(Self::KIND.tag(), self.as_str())
    }
}

impl Asset {
    /// Extract a typed value, failing if the stored asset is of another kind
    pub fn into_value<T: AssetValue>(self, checksum: Checksum) -> Result<T, AssetError> {
        let actual = self.kind();
        T::from_asset(self).ok_or(AssetError::KindMismatch {
            checksum,
            expected: T::KIND,
            actual,
        })
    }

    /// Binary encoding used by on-disk stores
    pub fn encode(&self) -> Result<Vec<u8>, AssetError> {
        bincode::serialize(self).map_err(|e| AssetError::Decode {
            reason: format!("failed to encode {:?}: {}", self.kind(), e),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        bincode::deserialize(bytes).map_err(|e| AssetError::Decode {
            reason: e.to_string(),
        })
    }
}
