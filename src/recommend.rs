//! Recommendations - static table and collaborative filtering
//!
//! The viewer draws recommendation connectors from a [`RecommendationTable`].
//! The table is either the static one from config or computed here from the
//! binary ratings matrix R (users x shows):
//! - User-user: Su = P^-1/2 R R^T P^-1/2, scores = Su[u,:] R
//! - Item-item: Si = Q^-1/2 R^T R Q^-1/2, scores = R[u,:] Si
//!
//! P and Q are the user and item degree diagonals (zero degrees count as 1).

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::dataset::Dataset;

/// One recommended show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub index: usize,
}

/// User id -> ordered recommendations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationTable(HashMap<String, Vec<Recommendation>>);

impl RecommendationTable {
    pub fn new(entries: HashMap<String, Vec<Recommendation>>) -> Self {
        Self(entries)
    }

    pub fn get(&self, user_id: &str) -> Option<&[Recommendation]> {
        self.0.get(user_id).map(Vec::as_slice)
    }

    pub fn insert(&mut self, user_id: impl Into<String>, recs: Vec<Recommendation>) {
        self.0.insert(user_id.into(), recs);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compute top-k recommendations for every user in the dataset
    pub fn computed(dataset: &Dataset, method: Method, top_k: usize) -> Self {
        let matrix = RatingMatrix::from_dataset(dataset);
        let (m, n) = matrix.shape();
        tracing::debug!("Rating matrix: {} users x {} shows", m, n);
        let mut table = Self::default();
        for user in &dataset.users {
            if let Some(scored) = matrix.recommend(&user.id, method, top_k) {
                let recs = scored
                    .into_iter()
                    .map(|s| Recommendation { name: s.name, index: s.index })
                    .collect();
                table.insert(user.id.clone(), recs);
            }
        }
        tracing::info!("Computed {} recommendations for {} users", method, table.len());
        table
    }
}

/// Collaborative filtering flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    UserUser,
    ItemItem,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::UserUser => write!(f, "user-user"),
            Method::ItemItem => write!(f, "item-item"),
        }
    }
}

/// A recommendation with its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredShow {
    pub index: usize,
    pub score: f64,
    pub name: String,
}

/// Binary ratings matrix with row/column lookups
pub struct RatingMatrix {
    r: Array2<f64>,
    user_rows: HashMap<String, usize>,
    show_names: Vec<String>,
}

impl RatingMatrix {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let m = dataset.users.len();
        let n = dataset.shows.len();
        let mut r = Array2::<f64>::zeros((m, n));
        let mut user_rows = HashMap::with_capacity(m);

        for (row, user) in dataset.users.iter().enumerate() {
            // First occurrence wins, same as the scene's marker lookup
            user_rows.entry(user.id.clone()).or_insert(row);
            for col in dataset.watched(&user.id) {
                r[[row, col]] = 1.0;
            }
        }

        Self {
            r,
            user_rows,
            show_names: dataset.shows.iter().map(|s| s.name.clone()).collect(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.r.dim()
    }

    /// Matrix row of a user id
    pub fn user_row(&self, user_id: &str) -> Option<usize> {
        self.user_rows.get(user_id).copied()
    }

    /// User and item degree vectors (diagonals of P and Q)
    pub fn degrees(&self) -> (Array1<f64>, Array1<f64>) {
        (self.r.sum_axis(ndarray::Axis(1)), self.r.sum_axis(ndarray::Axis(0)))
    }

    /// Su[u,:] R
    pub fn user_user_scores(&self, row: usize) -> Array1<f64> {
        let (p, _) = self.degrees();
        let p_inv_sqrt = inv_sqrt(&p);

        // (R R^T)[u,:] = R R[u,:]
        let overlaps = self.r.dot(&self.r.row(row));
        let su_row = overlaps * &p_inv_sqrt * p_inv_sqrt[row];
        su_row.dot(&self.r)
    }

    /// R[u,:] Si
    pub fn item_item_scores(&self, row: usize) -> Array1<f64> {
        let (_, q) = self.degrees();
        let q_inv_sqrt = inv_sqrt(&q);

        let weighted = &self.r.row(row) * &q_inv_sqrt;
        let co_occurrence = self.r.t().dot(&self.r.dot(&weighted));
        co_occurrence * &q_inv_sqrt
    }

    pub fn scores(&self, row: usize, method: Method) -> Array1<f64> {
        match method {
            Method::UserUser => self.user_user_scores(row),
            Method::ItemItem => self.item_item_scores(row),
        }
    }

    /// Top-k unwatched shows for a user, `None` if the user is unknown
    pub fn recommend(&self, user_id: &str, method: Method, top_k: usize) -> Option<Vec<ScoredShow>> {
        let row = self.user_row(user_id)?;
        let scores = self.scores(row, method);
        let watched = self.r.row(row);
        let candidates: Vec<usize> = (0..self.show_names.len())
            .filter(|&col| watched[col] == 0.0)
            .collect();
        Some(self.top_k(scores.view(), &candidates, top_k))
    }

    /// Highest score first, lower index breaks ties
    pub fn top_k(&self, scores: ArrayView1<f64>, candidates: &[usize], k: usize) -> Vec<ScoredShow> {
        let mut ranked: Vec<(usize, f64)> = candidates.iter().map(|&idx| (idx, scores[idx])).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(k)
            .map(|(index, score)| ScoredShow {
                index,
                score,
                name: self.show_names[index].clone(),
            })
            .collect()
    }
}

fn inv_sqrt(degrees: &Array1<f64>) -> Array1<f64> {
    degrees.mapv(|d| if d == 0.0 { 1.0 } else { 1.0 / d.sqrt() })
}

/// Overlap between two recommendation lists, by show name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overlap {
    pub common: Vec<String>,
    pub only_left: Vec<String>,
    pub only_right: Vec<String>,
}

pub fn overlap(left: &[ScoredShow], right: &[ScoredShow]) -> Overlap {
    let l: BTreeSet<&str> = left.iter().map(|s| s.name.as_str()).collect();
    let r: BTreeSet<&str> = right.iter().map(|s| s.name.as_str()).collect();

    Overlap {
        common: l.intersection(&r).map(|s| s.to_string()).collect(),
        only_left: l.difference(&r).map(|s| s.to_string()).collect(),
        only_right: r.difference(&l).map(|s| s.to_string()).collect(),
    }
}

/// Scores side by side at each rank, for comparing two methods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankScores {
    pub rank: usize,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

pub fn rank_scores(left: &[ScoredShow], right: &[ScoredShow]) -> Vec<RankScores> {
    (0..left.len().max(right.len()))
        .map(|i| RankScores {
            rank: i + 1,
            left: left.get(i).map(|s| s.score),
            right: right.get(i).map(|s| s.score),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ShowRecord, UserRecord};

    fn dataset(ratings: &[(&str, &[i64])], n_shows: usize) -> Dataset {
        Dataset {
            shows: (0..n_shows)
                .map(|i| ShowRecord { name: format!("Show {}", i), x: 0.0, y: 0.0, z: 0.0 })
                .collect(),
            users: ratings
                .iter()
                .map(|(id, _)| UserRecord { id: id.to_string(), name: id.to_uppercase(), x: 0.0, y: 0.0, z: 0.0 })
                .collect(),
            ratings: ratings.iter().map(|(id, r)| (id.to_string(), r.to_vec())).collect(),
        }
    }

    #[test]
    fn test_matrix_is_binary() {
        let data = dataset(&[("a", &[0, 2, 9]), ("b", &[1])], 3);
        let matrix = RatingMatrix::from_dataset(&data);
        assert_eq!(matrix.shape(), (2, 3));

        let (p, q) = matrix.degrees();
        assert_eq!(p.to_vec(), vec![2.0, 1.0]);
        assert_eq!(q.to_vec(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_user_user_matches_formula() {
        // a: {0,1}, b: {0,1,2}, c: {3}
        let data = dataset(&[("a", &[0, 1]), ("b", &[0, 1, 2]), ("c", &[3])], 4);
        let matrix = RatingMatrix::from_dataset(&data);
        let scores = matrix.user_user_scores(0);

        // Su[a,a] = 2/2 = 1, Su[a,b] = 2/sqrt(6), Su[a,c] = 0
        let s_ab = 2.0 / 6f64.sqrt();
        let expected = [1.0 + s_ab, 1.0 + s_ab, s_ab, 0.0];
        for (got, want) in scores.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {} want {}", got, want);
        }
    }

    #[test]
    fn test_item_item_matches_formula() {
        let data = dataset(&[("a", &[0, 1]), ("b", &[0, 1, 2]), ("c", &[3])], 4);
        let matrix = RatingMatrix::from_dataset(&data);
        let scores = matrix.item_item_scores(0);

        // Column degrees q = [2, 2, 1, 1]
        // Si[i,j] = co(i,j) / sqrt(q_i q_j); score_j = Si[0,j] + Si[1,j]
        let expected = [
            2.0 / 2.0 + 2.0 / 2.0,
            2.0 / 2.0 + 2.0 / 2.0,
            1.0 / 2f64.sqrt() + 1.0 / 2f64.sqrt(),
            0.0,
        ];
        for (got, want) in scores.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {} want {}", got, want);
        }
    }

    #[test]
    fn test_recommend_excludes_watched() {
        let data = dataset(&[("a", &[0, 1]), ("b", &[0, 1, 2]), ("c", &[3])], 4);
        let matrix = RatingMatrix::from_dataset(&data);

        let recs = matrix.recommend("a", Method::UserUser, 5).unwrap();
        let indices: Vec<usize> = recs.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![2, 3]);
        assert_eq!(recs[0].name, "Show 2");

        assert!(matrix.recommend("zed", Method::ItemItem, 5).is_none());
    }

    #[test]
    fn test_top_k_tie_breaks_on_index() {
        let data = dataset(&[("a", &[])], 4);
        let matrix = RatingMatrix::from_dataset(&data);
        let scores = Array1::from(vec![1.0, 3.0, 3.0, 0.5]);

        let top = matrix.top_k(scores.view(), &[0, 1, 2, 3], 3);
        let indices: Vec<usize> = top.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[test]
    fn test_zero_degree_user_scores_zero() {
        let data = dataset(&[("a", &[]), ("b", &[0])], 2);
        let matrix = RatingMatrix::from_dataset(&data);
        assert!(matrix.user_user_scores(0).iter().all(|&s| s == 0.0));
        assert!(matrix.item_item_scores(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_computed_table_covers_users() {
        let data = dataset(&[("a", &[0, 1]), ("b", &[0, 1, 2]), ("c", &[3])], 4);
        let table = RecommendationTable::computed(&data, Method::ItemItem, 1);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("a").unwrap(), &[Recommendation { name: "Show 2".into(), index: 2 }]);
    }

    #[test]
    fn test_overlap() {
        let show = |i: usize| ScoredShow { index: i, score: 1.0, name: format!("Show {}", i) };
        let result = overlap(&[show(1), show(2)], &[show(2), show(3)]);
        assert_eq!(result.common, vec!["Show 2"]);
        assert_eq!(result.only_left, vec!["Show 1"]);
        assert_eq!(result.only_right, vec!["Show 3"]);
    }

    #[test]
    fn test_rank_scores_pads_shorter_list() {
        let show = |i: usize, score: f64| ScoredShow { index: i, score, name: format!("Show {}", i) };
        let rows = rank_scores(&[show(1, 2.5), show(2, 1.0)], &[show(3, 0.75)]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RankScores { rank: 1, left: Some(2.5), right: Some(0.75) });
        assert_eq!(rows[1], RankScores { rank: 2, left: Some(1.0), right: None });
        assert!(rank_scores(&[], &[]).is_empty());
    }

    #[test]
    fn test_duplicate_user_id_resolves_first_row() {
        let mut data = dataset(&[("u", &[0]), ("v", &[1])], 3);
        data.users[1].id = "u".into();
        let matrix = RatingMatrix::from_dataset(&data);

        assert_eq!(matrix.user_row("u"), Some(0));
        assert_eq!(matrix.user_row("u"), crate::scene::Scene::from_dataset(&data).find_user("u"));
        assert_eq!(matrix.user_row("v"), None);
    }
}
