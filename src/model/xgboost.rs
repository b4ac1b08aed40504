//! Evaluator for XGBoost models saved with `Booster.save_model("*.json")`.
//!
//! Only the `gbtree` booster with numerical splits is supported. `predict`
//! mirrors the scikit-learn wrapper: classifiers yield class labels,
//! regressors yield transformed scores.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::tree::{RawTree, Tree};
use super::{Classifier, ModelError, Prediction};

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    learner_model_param: LearnerParam,
    objective: ObjectiveSection,
    gradient_booster: Booster,
}

#[derive(Debug, Deserialize)]
struct LearnerParam {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
    #[serde(default)]
    num_target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveSection {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Booster {
    name: String,
    #[serde(default)]
    model: Option<GbTree>,
}

#[derive(Debug, Deserialize)]
struct GbTree {
    trees: Vec<RawTree>,
    tree_info: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Objective {
    /// binary:logistic
    Binary,
    /// binary:logitraw, labelled by the sign of the raw margin
    LogitRaw,
    /// binary:hinge, base_score is already a margin
    Hinge,
    /// multi:softmax, multi:softprob
    MultiClass,
    /// reg:logistic
    Logistic,
    /// count:poisson, reg:gamma, reg:tweedie
    LogLink,
    /// squared, absolute, pseudo-huber and quantile regression
    Identity,
}

impl Objective {
    fn parse(name: &str) -> Result<Self, ModelError> {
        match name {
            "binary:logistic" => Ok(Objective::Binary),
            "binary:logitraw" => Ok(Objective::LogitRaw),
            "binary:hinge" => Ok(Objective::Hinge),
            "multi:softmax" | "multi:softprob" => Ok(Objective::MultiClass),
            "reg:logistic" => Ok(Objective::Logistic),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Ok(Objective::LogLink),
            "reg:squarederror" | "reg:squaredlogerror" | "reg:pseudohubererror"
            | "reg:absoluteerror" | "reg:quantileerror" => Ok(Objective::Identity),
            other => Err(ModelError::Unsupported(format!("objective {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct XgbModel {
    objective: Objective,
    objective_name: String,
    num_features: usize,
    num_groups: usize,
    base_margin: f32,
    trees: Vec<Tree>,
    /// Output group of each tree.
    groups: Vec<usize>,
}

impl XgbModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json(&text)?;
        info!(
            "Loaded {} model from {}: {} trees, {} features",
            model.objective_name,
            path.display(),
            model.trees.len(),
            model.num_features
        );
        Ok(model)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_str(text)?;
        let learner = file.learner;
        let param = learner.learner_model_param;

        let objective = Objective::parse(&learner.objective.name)?;
        let num_features: usize = parse_param("num_feature", &param.num_feature)?;
        let num_class: usize = match &param.num_class {
            Some(v) => parse_param("num_class", v)?,
            None => 0,
        };
        if let Some(v) = &param.num_target {
            let targets: usize = parse_param("num_target", v)?;
            if targets > 1 {
                return Err(ModelError::Unsupported("multi-target models".into()));
            }
        }
        let num_groups = match (objective, num_class) {
            (Objective::MultiClass, n) if n >= 2 => n,
            (Objective::MultiClass, n) => {
                return Err(ModelError::InvalidParam {
                    name: "num_class",
                    value: n.to_string(),
                })
            }
            _ => 1,
        };

        let base_score = parse_base_score(&param.base_score)?;
        let base_margin = match objective {
            Objective::Binary | Objective::LogitRaw | Objective::Logistic => logit(base_score),
            Objective::LogLink => base_score.ln(),
            Objective::Hinge | Objective::MultiClass | Objective::Identity => base_score,
        };
        if !base_margin.is_finite() {
            return Err(ModelError::InvalidParam {
                name: "base_score",
                value: param.base_score,
            });
        }

        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelError::Unsupported(format!(
                "booster {}",
                learner.gradient_booster.name
            )));
        }
        let gbtree = learner
            .gradient_booster
            .model
            .ok_or_else(|| ModelError::Unsupported("gbtree without model section".into()))?;
        if gbtree.tree_info.len() != gbtree.trees.len() {
            return Err(ModelError::InvalidParam {
                name: "tree_info",
                value: format!("{} entries for {} trees", gbtree.tree_info.len(), gbtree.trees.len()),
            });
        }

        let mut trees = Vec::with_capacity(gbtree.trees.len());
        let mut groups = Vec::with_capacity(gbtree.trees.len());
        for (index, (raw, group)) in gbtree.trees.into_iter().zip(gbtree.tree_info).enumerate() {
            let tree = Tree::from_raw(raw, index)?;
            if let Some(f) = tree.max_feature() {
                if f >= num_features {
                    return Err(ModelError::MalformedTree {
                        index,
                        reason: format!("splits on feature {} of {}", f, num_features),
                    });
                }
            }
            let group = usize::try_from(group)
                .ok()
                .filter(|&g| g < num_groups)
                .ok_or_else(|| ModelError::MalformedTree {
                    index,
                    reason: format!("output group {} of {}", group, num_groups),
                })?;
            trees.push(tree);
            groups.push(group);
        }

        Ok(XgbModel {
            objective,
            objective_name: learner.objective.name,
            num_features,
            num_groups,
            base_margin: base_margin as f32,
            trees,
            groups,
        })
    }

    /// Raw margins for one row, one per output group.
    fn margins(&self, row: &[f32]) -> Vec<f32> {
        let mut margins = vec![self.base_margin; self.num_groups];
        for (tree, &group) in self.trees.iter().zip(&self.groups) {
            margins[group] += tree.leaf_value(row);
        }
        margins
    }

    fn transform(&self, margins: &[f32]) -> Prediction {
        match self.objective {
            Objective::Binary => {
                let p = sigmoid(margins[0]);
                Prediction::Label(u32::from(p > 0.5))
            }
            Objective::LogitRaw | Objective::Hinge => {
                Prediction::Label(u32::from(margins[0] > 0.0))
            }
            Objective::MultiClass => {
                let best = margins
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &m)| {
                        if m > best.1 {
                            (i, m)
                        } else {
                            best
                        }
                    });
                Prediction::Label(best.0 as u32)
            }
            Objective::Logistic => Prediction::Value(f64::from(sigmoid(margins[0]))),
            Objective::LogLink => Prediction::Value(f64::from(margins[0].exp())),
            Objective::Identity => Prediction::Value(f64::from(margins[0])),
        }
    }
}

impl Classifier for XgbModel {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Prediction>, ModelError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.num_features {
                    return Err(ModelError::FeatureMismatch {
                        expected: self.num_features,
                        got: row.len(),
                    });
                }
                let row: Vec<f32> = row.iter().map(|&v| v as f32).collect();
                Ok(self.transform(&self.margins(&row)))
            })
            .collect()
    }
}

fn parse_param<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ModelError> {
    value.trim().parse().map_err(|_| ModelError::InvalidParam {
        name,
        value: value.to_string(),
    })
}

/// Newer XGBoost writes `"[5E-1]"`, older `"5E-1"`.
fn parse_base_score(raw: &str) -> Result<f64, ModelError> {
    let first = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .next()
        .unwrap_or_default();
    parse_param("base_score", first)
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/binary_model.json"))
            .unwrap()
    }

    fn row(lines: f64, ext_refs: f64) -> Vec<f64> {
        vec![lines, 100.0, 30.0, 2.0, ext_refs, 0.2, 0.7, 11.0]
    }

    #[test]
    fn loads_fixture() {
        let m = XgbModel::from_json(&fixture()).unwrap();
        assert_eq!(m.num_features(), 8);
        assert_eq!(m.trees.len(), 2);
        assert_eq!(m.base_margin, 0.0);
    }

    #[test]
    fn binary_labels() {
        let m = XgbModel::from_json(&fixture()).unwrap();
        // tiny pages with many external links lean malicious
        let out = m.predict(&[row(3.0, 40.0), row(500.0, 2.0)]).unwrap();
        assert_eq!(out, vec![Prediction::Label(1), Prediction::Label(0)]);
    }

    #[test]
    fn zero_page_features_predict() {
        let m = XgbModel::from_json(&fixture()).unwrap();
        let out = m.predict(&[row(0.0, 0.0)]).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn wrong_width_is_error() {
        let m = XgbModel::from_json(&fixture()).unwrap();
        let err = m.predict(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, ModelError::FeatureMismatch { expected: 8, got: 2 }));
    }

    #[test]
    fn base_score_formats() {
        assert_eq!(parse_base_score("5E-1").unwrap(), 0.5);
        assert_eq!(parse_base_score("[5E-1]").unwrap(), 0.5);
        assert_eq!(parse_base_score("[2.5E-1,3E-1]").unwrap(), 0.25);
        assert!(parse_base_score("nope").is_err());
    }

    fn single_leaf(objective: &str, base_score: &str, num_class: &str, leaves: &[(f32, i64)]) -> String {
        let trees: Vec<String> = leaves
            .iter()
            .map(|(v, _)| {
                format!(
                    r#"{{"left_children":[-1],"right_children":[-1],"split_indices":[0],"split_conditions":[{}],"default_left":[0]}}"#,
                    v
                )
            })
            .collect();
        let info: Vec<String> = leaves.iter().map(|(_, g)| g.to_string()).collect();
        format!(
            r#"{{"learner":{{"learner_model_param":{{"base_score":"{}","num_feature":"1","num_class":"{}"}},
            "objective":{{"name":"{}"}},
            "gradient_booster":{{"name":"gbtree","model":{{"trees":[{}],"tree_info":[{}]}}}}}}}}"#,
            base_score,
            num_class,
            objective,
            trees.join(","),
            info.join(",")
        )
    }

    #[test]
    fn multiclass_argmax() {
        let json = single_leaf("multi:softprob", "5E-1", "3", &[(0.1, 0), (0.9, 1), (-0.3, 2)]);
        let m = XgbModel::from_json(&json).unwrap();
        assert_eq!(m.predict(&[vec![0.0]]).unwrap(), vec![Prediction::Label(1)]);
    }

    #[test]
    fn regression_value() {
        let json = single_leaf("reg:squarederror", "5E-1", "0", &[(1.5, 0)]);
        let m = XgbModel::from_json(&json).unwrap();
        assert_eq!(m.predict(&[vec![0.0]]).unwrap(), vec![Prediction::Value(2.0)]);
    }

    #[test]
    fn hinge_margin_starts_at_base_score() {
        // 0.5 - 0.3 stays positive; a logit base would start at 0 and go negative
        let json = single_leaf("binary:hinge", "5E-1", "0", &[(-0.3, 0)]);
        let m = XgbModel::from_json(&json).unwrap();
        assert_eq!(m.base_margin, 0.5);
        assert_eq!(m.predict(&[vec![0.0]]).unwrap(), vec![Prediction::Label(1)]);

        let json = single_leaf("binary:hinge", "8E-1", "0", &[(-1.0, 0)]);
        let m = XgbModel::from_json(&json).unwrap();
        assert_eq!(m.predict(&[vec![0.0]]).unwrap(), vec![Prediction::Label(0)]);
    }

    #[test]
    fn logitraw_labels_by_margin_sign() {
        // logit(0.8) is about 1.386, so a -1.0 leaf leaves the margin positive
        let json = single_leaf("binary:logitraw", "8E-1", "0", &[(-1.0, 0)]);
        let m = XgbModel::from_json(&json).unwrap();
        assert_eq!(m.predict(&[vec![0.0]]).unwrap(), vec![Prediction::Label(1)]);

        let json = single_leaf("binary:logitraw", "5E-1", "0", &[(-0.25, 0)]);
        let m = XgbModel::from_json(&json).unwrap();
        assert_eq!(m.base_margin, 0.0);
        assert_eq!(m.predict(&[vec![0.0]]).unwrap(), vec![Prediction::Label(0)]);
    }

    #[test]
    fn rejects_unknown_objective() {
        let json = single_leaf("rank:pairwise", "5E-1", "0", &[(1.0, 0)]);
        assert!(matches!(XgbModel::from_json(&json), Err(ModelError::Unsupported(_))));
    }

    #[test]
    fn rejects_group_out_of_range() {
        let json = single_leaf("binary:logistic", "5E-1", "0", &[(1.0, 1)]);
        assert!(matches!(
            XgbModel::from_json(&json),
            Err(ModelError::MalformedTree { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_dart() {
        let json = r#"{"learner":{"learner_model_param":{"base_score":"5E-1","num_feature":"8"},
            "objective":{"name":"binary:logistic"},
            "gradient_booster":{"name":"dart"}}}"#;
        assert!(matches!(XgbModel::from_json(json), Err(ModelError::Unsupported(_))));
    }

    #[test]
    fn missing_file() {
        let err = XgbModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn garbage_file_is_json_error() {
        assert!(matches!(XgbModel::from_json("not json"), Err(ModelError::Json(_))));
    }
}
