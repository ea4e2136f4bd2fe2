//! Generic wide-to-long primitive.
//!
//! Both the year series and the field-of-study charts are the same
//! operation: take labelled rows of cells under a list of column keys and
//! emit one `(label, key, value)` triple per cell, in row order then
//! column order. Transposing a single row is melting a one-row table.

/// One cell of a wide table, addressed by row label and column key.
#[derive(Debug, Clone, PartialEq)]
pub struct Melted<K, V> {
    pub label: String,
    pub key: K,
    pub value: V,
}

/// Melt labelled rows over `keys`.
///
/// Rows shorter than `keys` are padded with `V::default()`; extra cells
/// are ignored. Output length is always `rows * keys.len()`.
pub fn melt_rows<'a, K, V, I>(rows: I, keys: &[K]) -> Vec<Melted<K, V>>
where
    I: IntoIterator<Item = (&'a str, &'a [V])>,
    K: Clone,
    V: Clone + Default + 'a,
{
    let mut out = Vec::new();
    for (label, values) in rows {
        for (i, key) in keys.iter().enumerate() {
            out.push(Melted {
                label: label.to_string(),
                key: key.clone(),
                value: values.get(i).cloned().unwrap_or_default(),
            });
        }
    }
    out
}

/// Pair two melted rows by key, in the order of `left`.
///
/// Keys missing from `right` pair with `V::default()`.
pub fn pair_by_key<K, V>(left: &[Melted<K, V>], right: &[Melted<K, V>]) -> Vec<(K, V, V)>
where
    K: Clone + PartialEq,
    V: Clone + Default,
{
    left.iter()
        .map(|l| {
            let r = right
                .iter()
                .find(|r| r.key == l.key)
                .map(|r| r.value.clone())
                .unwrap_or_default();
            (l.key.clone(), l.value.clone(), r)
        })
        .collect()
}
