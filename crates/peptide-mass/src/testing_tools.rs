use miette::Diagnostic;

/// Flattens the labels of a diagnostic into `(label, offset, length)` triples
pub fn diagnostic_labels(diagnostic: &dyn Diagnostic) -> Vec<(String, usize, usize)> {
    diagnostic
        .labels()
        .into_iter()
        .flatten()
        .map(|l| {
            (
                l.label().unwrap_or_default().to_owned(),
                l.offset(),
                l.len(),
            )
        })
        .collect()
}
