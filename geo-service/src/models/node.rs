//! Geo node model - one record shape for every level of the three national
//! structures, discriminated by an explicit `kind`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The three parallel national structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Structure {
    #[serde(rename = "PNG", alias = "png")]
    Png,
    #[serde(rename = "ABG", alias = "abg")]
    Abg,
    #[serde(rename = "MKA", alias = "mka")]
    Mka,
}

impl Structure {
    pub const ALL: [Structure; 3] = [Structure::Png, Structure::Abg, Structure::Mka];

    pub fn as_str(&self) -> &'static str {
        match self {
            Structure::Png => "PNG",
            Structure::Abg => "ABG",
            Structure::Mka => "MKA",
        }
    }

    /// Descriptive label stored on the structure's root region.
    pub fn label(&self) -> &'static str {
        match self {
            Structure::Png => "National",
            Structure::Abg => "Autonomous Region",
            Structure::Mka => "Assembly",
        }
    }

    /// Display order of the root region.
    pub fn order(&self) -> i32 {
        match self {
            Structure::Png => 0,
            Structure::Abg => 1,
            Structure::Mka => 2,
        }
    }

    /// Kinds from the root region down to the leaf location.
    pub fn kind_sequence(&self) -> &'static [NodeKind] {
        match self {
            Structure::Png => &[
                NodeKind::GeoRegion,
                NodeKind::Province,
                NodeKind::District,
                NodeKind::Llg,
                NodeKind::Ward,
                NodeKind::Location,
            ],
            Structure::Abg => &[
                NodeKind::GeoRegion,
                NodeKind::Region,
                NodeKind::AbgDistrict,
                NodeKind::Constituency,
                NodeKind::Location,
            ],
            Structure::Mka => &[
                NodeKind::GeoRegion,
                NodeKind::MkaRegion,
                NodeKind::MkaWard,
                NodeKind::Location,
            ],
        }
    }
}

impl std::fmt::Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Structure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PNG" => Ok(Structure::Png),
            "ABG" => Ok(Structure::Abg),
            "MKA" => Ok(Structure::Mka),
            _ => Err(format!("Unknown structure: {}", s)),
        }
    }
}

/// Node kinds across all structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    GeoRegion,
    Province,
    District,
    Llg,
    Ward,
    Location,
    Region,
    AbgDistrict,
    Constituency,
    MkaRegion,
    MkaWard,
}

impl NodeKind {
    /// Probe order used when an id arrives without its kind.
    pub const RESOLVE_ORDER: [NodeKind; 10] = [
        NodeKind::Province,
        NodeKind::District,
        NodeKind::Llg,
        NodeKind::Ward,
        NodeKind::Location,
        NodeKind::Region,
        NodeKind::AbgDistrict,
        NodeKind::Constituency,
        NodeKind::MkaRegion,
        NodeKind::MkaWard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::GeoRegion => "geo_region",
            NodeKind::Province => "province",
            NodeKind::District => "district",
            NodeKind::Llg => "llg",
            NodeKind::Ward => "ward",
            NodeKind::Location => "location",
            NodeKind::Region => "region",
            NodeKind::AbgDistrict => "abg_district",
            NodeKind::Constituency => "constituency",
            NodeKind::MkaRegion => "mka_region",
            NodeKind::MkaWard => "mka_ward",
        }
    }

    /// Parse a stored kind discriminant.
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "geo_region" => NodeKind::GeoRegion,
            "province" => NodeKind::Province,
            "district" => NodeKind::District,
            "llg" => NodeKind::Llg,
            "ward" => NodeKind::Ward,
            "location" => NodeKind::Location,
            "region" => NodeKind::Region,
            "abg_district" => NodeKind::AbgDistrict,
            "constituency" => NodeKind::Constituency,
            "mka_region" => NodeKind::MkaRegion,
            "mka_ward" => NodeKind::MkaWard,
            _ => return None,
        };
        Some(kind)
    }

    /// Map an administrative type name to a kind within a structure.
    ///
    /// `district` and `ward` are ambiguous across structures, and both
    /// `village` and `section` name the leaf location, so the structure
    /// decides. Stored kind names are accepted as-is.
    pub fn from_type(type_name: &str, structure: Structure) -> Option<Self> {
        let normalized = type_name.trim().to_lowercase();
        let kind = match (normalized.as_str(), structure) {
            ("province", Structure::Png) => NodeKind::Province,
            ("district", Structure::Png) => NodeKind::District,
            ("llg", Structure::Png) => NodeKind::Llg,
            ("ward", Structure::Png) => NodeKind::Ward,
            ("village" | "location", Structure::Png | Structure::Abg) => NodeKind::Location,
            ("region", Structure::Abg) => NodeKind::Region,
            ("district" | "abg_district", Structure::Abg) => NodeKind::AbgDistrict,
            ("constituency", Structure::Abg) => NodeKind::Constituency,
            ("region" | "mka_region", Structure::Mka) => NodeKind::MkaRegion,
            ("ward" | "mka_ward", Structure::Mka) => NodeKind::MkaWard,
            ("section" | "location", Structure::Mka) => NodeKind::Location,
            _ => return None,
        };
        Some(kind)
    }

    /// The structure a kind belongs to. Roots and locations span structures.
    pub fn home_structure(&self) -> Option<Structure> {
        match self {
            NodeKind::GeoRegion | NodeKind::Location => None,
            NodeKind::Province | NodeKind::District | NodeKind::Llg | NodeKind::Ward => {
                Some(Structure::Png)
            }
            NodeKind::Region | NodeKind::AbgDistrict | NodeKind::Constituency => {
                Some(Structure::Abg)
            }
            NodeKind::MkaRegion | NodeKind::MkaWard => Some(Structure::Mka),
        }
    }

    /// Name of the leaf list projected onto nodes that hold locations.
    pub fn leaf_list_name(&self) -> Option<&'static str> {
        match self {
            NodeKind::Ward | NodeKind::Constituency => Some("villages"),
            NodeKind::MkaWard => Some("sections"),
            _ => None,
        }
    }

    /// Kind-specific name of the parent reference, e.g. `llgId` for a ward.
    pub fn parent_field(&self, parent_kind: NodeKind) -> Option<&'static str> {
        let field = match (self, parent_kind) {
            (NodeKind::Province | NodeKind::Region | NodeKind::MkaRegion, NodeKind::GeoRegion) => {
                "geoRegionId"
            }
            (NodeKind::District, NodeKind::Province) => "provinceId",
            (NodeKind::Llg, NodeKind::District) => "districtId",
            (NodeKind::Ward, NodeKind::Llg) => "llgId",
            (NodeKind::AbgDistrict, NodeKind::Region) => "regionId",
            (NodeKind::Constituency, NodeKind::AbgDistrict) => "districtId",
            (NodeKind::MkaWard, NodeKind::MkaRegion) => "mkaRegionId",
            (NodeKind::Location, NodeKind::Ward) => "wardId",
            (NodeKind::Location, NodeKind::Constituency) => "constituencyId",
            (NodeKind::Location, NodeKind::MkaWard) => "mkaWardId",
            _ => return None,
        };
        Some(field)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed parent reference. Locations may point at a ward, a constituency
/// or an MKA ward, never more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub kind: NodeKind,
    pub id: Uuid,
}

/// Geo node entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoNode {
    pub id: Uuid,
    pub kind: NodeKind,
    pub structure: Structure,
    pub name: String,
    pub code: Option<String>,
    /// Only set on root regions ("National", ...).
    pub label: Option<String>,
    pub path: String,
    pub level: i32,
    pub order: i32,
    pub parent: Option<ParentRef>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl GeoNode {
    /// Create the root region of a structure.
    pub fn root(structure: Structure) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: NodeKind::GeoRegion,
            structure,
            name: structure.as_str().to_string(),
            code: None,
            label: Some(structure.label().to_string()),
            path: structure.as_str().to_string(),
            level: 0,
            order: structure.order(),
            parent: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Create a node under `parent`. The caller supplies the already built path.
    pub fn new_child(
        parent: &GeoNode,
        kind: NodeKind,
        name: String,
        code: Option<String>,
        path: String,
        order: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            structure: parent.structure,
            name,
            code,
            label: None,
            path,
            level: parent.level + 1,
            order,
            parent: Some(ParentRef {
                kind: parent.kind,
                id: parent.id,
            }),
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.kind == NodeKind::GeoRegion
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent.map(|p| p.id)
    }

    pub fn parent_field(&self) -> Option<&'static str> {
        self.parent.and_then(|p| self.kind.parent_field(p.kind))
    }
}

/// Row shape of `geo_nodes`.
#[derive(Debug, Clone, FromRow)]
pub struct GeoNodeRow {
    pub id: Uuid,
    pub kind: String,
    pub structure: String,
    pub name: String,
    pub code: Option<String>,
    pub label: Option<String>,
    pub path: String,
    pub level: i32,
    pub sort_order: i32,
    pub parent_kind: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl TryFrom<GeoNodeRow> for GeoNode {
    type Error = String;

    fn try_from(row: GeoNodeRow) -> Result<Self, Self::Error> {
        let kind =
            NodeKind::parse(&row.kind).ok_or_else(|| format!("Unknown node kind: {}", row.kind))?;
        let structure = row.structure.parse()?;
        let parent = match (row.parent_kind, row.parent_id) {
            (Some(parent_kind), Some(id)) => Some(ParentRef {
                kind: NodeKind::parse(&parent_kind)
                    .ok_or_else(|| format!("Unknown parent kind: {}", parent_kind))?,
                id,
            }),
            (None, None) => None,
            _ => return Err(format!("Node {} has a partial parent reference", row.id)),
        };

        Ok(Self {
            id: row.id,
            kind,
            structure,
            name: row.name,
            code: row.code,
            label: row.label,
            path: row.path,
            level: row.level,
            order: row.sort_order,
            parent,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}
