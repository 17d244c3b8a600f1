use super::{Category, ClassifierOptions};

/// Converts raw logits into probabilities. Vectors that already look like a
/// probability distribution are returned unchanged.
pub fn softmax(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let sum: f32 = values.iter().sum();
    if values.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3 {
        return values.to_vec();
    }
    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|&v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    if total > 1e-10 {
        exps.iter().map(|&e| e / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Picks the best `max_results` categories at or above the score threshold,
/// ordered by descending score.
pub fn top_categories(
    probabilities: &[f32],
    labels: &[String],
    options: &ClassifierOptions,
) -> Vec<Category> {
    let mut ranked: Vec<(usize, f32)> = probabilities
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| *score >= options.score_threshold)
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if options.max_results > 0 {
        ranked.truncate(options.max_results);
    }

    ranked
        .into_iter()
        .map(|(index, score)| {
            let label = labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", index));
            Category::new(index, label, score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_of_logits_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn test_softmax_keeps_probabilities() {
        let probs = softmax(&[0.7, 0.2, 0.1]);
        assert_eq!(probs, vec![0.7, 0.2, 0.1]);
    }

    #[test]
    fn test_top_categories_threshold_and_limit() {
        let labels: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let options = ClassifierOptions {
            score_threshold: 0.1,
            max_results: 2,
        };
        let categories = top_categories(&[0.05, 0.5, 0.3, 0.15], &labels, &options);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].category_name, "b");
        assert_eq!(categories[1].category_name, "c");
    }

    #[test]
    fn test_top_categories_missing_label() {
        let options = ClassifierOptions::default();
        let categories = top_categories(&[0.9], &[], &options);
        assert_eq!(categories[0].category_name, "class_0");
    }
}
