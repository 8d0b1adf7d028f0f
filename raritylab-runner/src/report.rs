//! Plain-text reports for validation and feasibility results.

use crate::feasibility::CollectionFeasibilityResult;
use crate::issues::Severity;
use crate::validator::DistributionValidationResult;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

pub fn distribution_report(result: &DistributionValidationResult) -> String {
    let collection = &result.collection_analysis;
    let mut report = format!(
        "{RULE}\nRARITY DISTRIBUTION VALIDATION REPORT\n{RULE}\n\n\
Overall Status: {}\n\
Overall Score: {:.2}/1.00\n\
Issues: {} errors, {} warnings, {} info\n",
        if result.is_valid { "VALID" } else { "INVALID" },
        result.overall_score,
        result.error_count(),
        result.warning_count(),
        result.issues_with(Severity::Info).count(),
    );

    report.push_str(&format!("\nCOLLECTION ANALYSIS\n{THIN_RULE}\n"));
    report.push_str(&format!(
        "Collection Size: {}\n",
        group_digits(collection.collection_size as u128)
    ));
    report.push_str(&format!(
        "Allow Duplicates: {}\n",
        yes_no(collection.allow_duplicates)
    ));
    report.push_str(&format!(
        "Trait Categories: {} ({} populated)\n",
        collection.total_trait_categories, collection.populated_categories
    ));
    report.push_str(&format!(
        "Grid Coverage: {}/9 cells{}\n",
        collection.occupied_cells.len(),
        if collection.complete_grid_coverage { " (complete)" } else { "" }
    ));
    report.push_str(&format!(
        "Possible Combinations: {}\n",
        group_digits(collection.total_possible_combinations)
    ));
    match collection.utilization_ratio {
        Some(ratio) => report.push_str(&format!("Utilization: {:.1}%\n", ratio * 100.0)),
        None => report.push_str("Utilization: n/a\n"),
    }
    report.push_str(&format!(
        "Unique Combinations Feasible: {} ({})\n",
        yes_no(collection.unique_combinations_feasible),
        collection.feasibility_level
    ));
    report.push_str(&format!(
        "Distribution Balance: {:.2}\nGeneration Complexity: {:.2}\n",
        collection.distribution_balance_score, collection.generation_complexity_score
    ));

    if !result.trait_analyses.is_empty() {
        report.push_str(&format!("\nTRAIT ANALYSIS\n{THIN_RULE}\n"));
        for analysis in result.trait_analyses.values() {
            report.push_str(&format!(
                "\n{} [{}]: {} variants, total weight {}, balance {:.2}\n",
                analysis.category_name,
                analysis.category_key,
                analysis.variant_count,
                analysis.total_weight,
                analysis.balance_score
            ));
            for v in &analysis.variants {
                let tier = v
                    .tier
                    .as_deref()
                    .map(|t| format!(" [{t}]"))
                    .unwrap_or_default();
                report.push_str(&format!(
                    "  - {}: weight {}, p={:.3}, expected {:.1} (range {}-{}){}\n",
                    v.name,
                    v.weight,
                    v.probability,
                    v.expected_occurrences,
                    v.min_possible_occurrence,
                    v.max_possible_occurrence,
                    tier
                ));
            }
            if let Some(stats) = result
                .simulation_results
                .as_ref()
                .and_then(|sims| sims.get(&analysis.category_key))
            {
                report.push_str(&format!(
                    "  simulation: {} draws, max deviation {:.4}{}\n",
                    group_digits(stats.sample_size as u128),
                    stats.max_deviation,
                    if stats.within_tolerance { "" } else { " (outside tolerance)" }
                ));
            }
        }
    }

    if !result.issues.is_empty() {
        report.push_str(&format!("\nISSUES\n{THIN_RULE}\n"));
        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            let group: Vec<_> = result.issues_with(severity).collect();
            if group.is_empty() {
                continue;
            }
            report.push_str(&format!("{severity} ({})\n", group.len()));
            for issue in group {
                report.push_str(&format!("  [{}] {}\n", issue.category, issue.message));
            }
        }
    }

    if !result.recommendations.is_empty() {
        report.push_str(&format!("\nRECOMMENDATIONS\n{THIN_RULE}\n"));
        for (i, rec) in result.recommendations.iter().enumerate() {
            report.push_str(&format!("{}. {}\n", i + 1, rec));
        }
    }

    report.push_str(RULE);
    report.push('\n');
    report
}

pub fn feasibility_report(result: &CollectionFeasibilityResult) -> String {
    let analysis = &result.combination_analysis;
    let mut report = format!(
        "{RULE}\nCOLLECTION FEASIBILITY REPORT\n{RULE}\n\n\
Feasible: {} ({})\n\
Collection Size: {}\n\
Possible Combinations: {}\n",
        yes_no(result.is_feasible),
        result.level,
        group_digits(analysis.collection_size as u128),
        group_digits(analysis.total_possible_combinations),
    );
    match analysis.utilization_ratio {
        Some(ratio) => report.push_str(&format!("Utilization: {:.1}%\n", ratio * 100.0)),
        None => report.push_str("Utilization: n/a\n"),
    }
    report.push_str(&format!(
        "Efficiency Score: {:.2}\nRequires Duplicates: {}\n",
        analysis.efficiency_score,
        yes_no(analysis.requires_duplicates)
    ));

    if !analysis.categories.is_empty() {
        report.push_str(&format!("\nCATEGORIES\n{THIN_RULE}\n"));
        for row in analysis.categories.values() {
            report.push_str(&format!(
                "  {} [{}]: {} variants{}\n",
                row.category_name,
                row.category_key,
                row.variant_count,
                if row.is_required { "" } else { " (optional)" }
            ));
        }
    }

    if !result.warnings.is_empty() {
        report.push_str(&format!("\nWARNINGS\n{THIN_RULE}\n"));
        for w in &result.warnings {
            report.push_str(&format!("  [{}] {}\n", w.severity, w.message));
            if let Some(rec) = &w.recommendation {
                report.push_str(&format!("      -> {rec}\n"));
            }
        }
    }

    let recs = &result.recommendations;
    report.push_str(&format!("\nRECOMMENDATIONS\n{THIN_RULE}\n"));
    if let Some(size) = recs.optimal_collection_size {
        report.push_str(&format!("Optimal Collection Size: {}\n", group_digits(size)));
    }
    if !recs.suggested_collection_sizes.is_empty() {
        let sizes: Vec<String> = recs
            .suggested_collection_sizes
            .iter()
            .map(|&s| group_digits(s))
            .collect();
        report.push_str(&format!("Suggested Sizes: {}\n", sizes.join(", ")));
    }
    for (key, count) in &recs.variant_recommendations {
        report.push_str(&format!("  add variants to '{key}': at least {count}\n"));
    }
    for line in recs
        .configuration_changes
        .iter()
        .chain(&recs.optimization_suggestions)
    {
        report.push_str(&format!("  - {line}\n"));
    }

    report.push_str(RULE);
    report.push('\n');
    report
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_digits(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feasibility::FeasibilityChecker;
    use crate::validator::DistributionValidator;
    use raritylab_core::{CollectionConfig, GridPosition, RarityTier, TraitCategory, TraitVariant};

    fn config(size: u64) -> CollectionConfig {
        CollectionConfig::new(size, false)
            .with_category(
                "bg",
                TraitCategory::new(
                    "Background",
                    GridPosition::new(0, 0),
                    vec![
                        TraitVariant::new("Blue", "blue.png", 100),
                        TraitVariant::new("Gold", "gold.png", 5),
                    ],
                ),
            )
            .with_tier("legendary", RarityTier { min_weight: 1, max_weight: 10 })
    }

    #[test]
    fn digits_are_grouped() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
    }

    #[test]
    fn distribution_report_has_every_section() {
        let result = DistributionValidator::default()
            .validate_distribution(Some(&config(10)), None)
            .unwrap();
        let text = distribution_report(&result);
        assert!(text.contains("RARITY DISTRIBUTION VALIDATION REPORT"));
        assert!(text.contains("Overall Status: INVALID"));
        assert!(text.contains("COLLECTION ANALYSIS"));
        assert!(text.contains("TRAIT ANALYSIS"));
        assert!(text.contains("Gold: weight 5"));
        assert!(text.contains("[legendary]"));
        assert!(text.contains("ERROR ("));
        assert!(text.contains("RECOMMENDATIONS"));
        assert!(text.is_ascii());
    }

    #[test]
    fn feasibility_report_lists_warnings() {
        let result = FeasibilityChecker::default()
            .check_feasibility(Some(&config(10)))
            .unwrap();
        let text = feasibility_report(&result);
        assert!(text.contains("Feasible: no (infeasible)"));
        assert!(text.contains("[critical]"));
        assert!(text.is_ascii());
    }
}
