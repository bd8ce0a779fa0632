//! Mechanism-class synonym expansion for literature queries.
//!
//! Broadens searches for drug classes whose trials are indexed under
//! class-level terminology rather than the individual agent.

use oncosel_common::entities::MoaClass;

/// Synonym terms appended (OR'd) to the literature query for a given
/// mechanism class. Classes without established class-level search
/// vocabulary get no expansion.
pub fn synonyms_for(class: MoaClass) -> &'static [&'static str] {
    match class {
        MoaClass::ImmuneCheckpoint => &[
            "immunotherapy",
            "checkpoint blockade",
            "PD-1 inhibitor",
        ],
        MoaClass::ParpInhibitor | MoaClass::PlatinumChemo => &[
            "DNA repair",
            "homologous recombination deficiency",
            "synthetic lethality",
        ],
        MoaClass::EgfrTki => &["EGFR-mutant", "tyrosine kinase inhibitor"],
        _ => &[],
    }
}

/// Build the broadened query string:
/// `{gene} {hgvs_p} "{drug}" {disease} (syn1 OR syn2 ...)`.
pub fn expand_query(
    gene: &str,
    hgvs_p: Option<&str>,
    drug: &str,
    class: MoaClass,
    disease: &str,
) -> String {
    let mut parts = vec![gene.to_string()];
    if let Some(p) = hgvs_p {
        parts.push(p.to_string());
    }
    parts.push(format!("\"{drug}\""));
    parts.push(disease.to_string());

    let syns = synonyms_for(class);
    if !syns.is_empty() {
        parts.push(format!("({})", syns.join(" OR ")));
    }

    parts.join(" ")
}
