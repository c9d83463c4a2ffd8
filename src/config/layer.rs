//! Layered values: merge into, replace, or clear a lower layer

use std::collections::BTreeMap;

/// How a collection-valued setting combines with the layer below it.
///
/// Decided once when the config is parsed: an `!override` tag produces
/// `Replace` (or `Clear` for an explicit null), anything else `Merge`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer<T> {
    /// Extend the lower layer
    Merge(T),
    /// Discard the lower layer and use this value
    Replace(T),
    /// Discard the lower layer and use nothing
    Clear,
}

/// Collections that know how to absorb a higher layer.
pub trait Mergeable: Default {
    fn merge(&mut self, upper: Self);
}

impl Mergeable for Vec<String> {
    fn merge(&mut self, upper: Self) {
        self.extend(upper);
    }
}

impl<K: Ord, V> Mergeable for BTreeMap<K, V> {
    /// Key-by-key; upper values win on conflict.
    fn merge(&mut self, upper: Self) {
        self.extend(upper);
    }
}

impl<T: Mergeable> Layer<T> {
    /// Apply this layer on top of `base`.
    pub fn apply(self, base: &mut T) {
        match self {
            Layer::Merge(value) => base.merge(value),
            Layer::Replace(value) => *base = value,
            Layer::Clear => *base = T::default(),
        }
    }

    /// The value this layer yields over an empty base.
    pub fn into_value(self) -> T {
        let mut base = T::default();
        self.apply(&mut base);
        base
    }
}

/// Apply an optional layer to `base`.
pub fn apply_layer<T: Mergeable>(base: &mut T, layer: Option<&Layer<T>>)
where
    T: Clone,
{
    if let Some(layer) = layer {
        layer.clone().apply(base);
    }
}
