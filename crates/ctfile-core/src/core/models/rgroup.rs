use super::ids::FragmentId;

/// An R-group: a site of structural variation with alternative fragments.
///
/// The R-group's number is the key under which it is stored in the owning
/// structure, not a field of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RGroup {
    /// Alternative fragments, in authoring order.
    pub fragments: Vec<FragmentId>,
    /// Number of the R-group that must be present if this one is (0 = none).
    pub if_then: u32,
    /// "Rest H": unsubstituted sites are hydrogens.
    pub rest_h: bool,
    /// Occurrence range expression, e.g. `>0` or `1-3`.
    pub range: String,
}

impl RGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_fragment(&self, fragment: FragmentId) -> bool {
        self.fragments.contains(&fragment)
    }

    /// Whether any of the logic fields deviate from their defaults.
    ///
    /// Only such R-groups produce a V2000 `M  LOG` record.
    pub fn has_logic(&self) -> bool {
        self.rest_h || self.if_then > 0 || !self.range.is_empty()
    }
}
