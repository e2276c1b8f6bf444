use super::ids::AtomId;
use nalgebra::Point2;

/// A reaction arrow, positioned at its center in the in-memory frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxnArrow {
    pub position: Point2<f64>,
}

impl RxnArrow {
    pub fn new(position: Point2<f64>) -> Self {
        Self { position }
    }
}

/// A reaction plus sign between two components of the same pile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxnPlus {
    pub position: Point2<f64>,
}

impl RxnPlus {
    pub fn new(position: Point2<f64>) -> Self {
        Self { position }
    }
}

/// The atoms of a reaction split into reactant and product piles.
///
/// Each inner vector is one connected component, in authoring order; piles
/// are ordered left to right.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReactionComponents {
    pub reactants: Vec<Vec<AtomId>>,
    pub products: Vec<Vec<AtomId>>,
}

impl ReactionComponents {
    /// All components, reactants first.
    pub fn all(&self) -> impl Iterator<Item = &Vec<AtomId>> {
        self.reactants.iter().chain(self.products.iter())
    }
}
