//! Scoring view over a submission's properties document.
//!
//! The grading service owns the document; a `GradeBook` holds a private copy
//! for one editing session, normalizes it once on construction and hands the
//! result back through `into_properties` for write-back. Fields this module
//! does not interpret are carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A score as the document wrote it. `5` and `5.0` both come back out of
/// write-back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points(Number);

impl Points {
    /// Finite, non-negative scores only.
    pub fn from_score(field: &'static str, value: f64) -> Result<Self, GradeBookError> {
        Number::from_f64(value)
            .filter(|_| value >= 0.0)
            .map(Points)
            .ok_or(GradeBookError::InvalidScore { field, value })
    }

    pub fn value(&self) -> f64 {
        self.0.as_f64().unwrap_or(0.0)
    }
}

impl Default for Points {
    fn default() -> Self {
        Points(Number::from(0))
    }
}

impl From<u32> for Points {
    fn from(v: u32) -> Self {
        Points(Number::from(v))
    }
}

fn points_or_zero(p: Option<&Points>) -> f64 {
    p.map_or(0.0, Points::value)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub auto_score: Option<Points>,
    pub manual_score: Option<Points>,
    pub extra_credit: Option<Points>,
    #[serde(default)]
    pub needs_manual_grade: bool,
    pub max_score_gradecell: Option<Points>,
    pub max_score_taskcell: Option<Points>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Grade {
    /// Placeholder for a task cell that has never been graded.
    pub fn for_task_cell(max_score: Points) -> Self {
        Self {
            max_score_taskcell: Some(max_score),
            ..Self::default()
        }
    }

    /// Manual score wins over auto score; neither means zero.
    pub fn score(&self) -> f64 {
        points_or_zero(self.manual_score.as_ref().or(self.auto_score.as_ref()))
    }

    pub fn max_score(&self) -> f64 {
        points_or_zero(
            self.max_score_taskcell
                .as_ref()
                .or(self.max_score_gradecell.as_ref()),
        )
    }
}

/// Autograded or task cell metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMeta {
    #[serde(default)]
    pub max_score: Points,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub manual_comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookRecord {
    #[serde(default)]
    pub grades_dict: BTreeMap<String, Grade>,
    #[serde(default)]
    pub grade_cells_dict: BTreeMap<String, CellMeta>,
    #[serde(default)]
    pub task_cells_dict: BTreeMap<String, CellMeta>,
    #[serde(default)]
    pub comments_dict: BTreeMap<String, Comment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotebookRecord {
    fn points(&self) -> f64 {
        self.grades_dict.values().map(Grade::score).sum()
    }

    fn max_points(&self) -> f64 {
        self.grades_dict.values().map(Grade::max_score).sum()
    }

    fn extra_credits(&self) -> f64 {
        self.grades_dict
            .values()
            .map(|g| points_or_zero(g.extra_credit.as_ref()))
            .sum()
    }

    fn needs_manual_grading(&self) -> bool {
        self.grades_dict.values().any(|g| g.needs_manual_grade)
    }

    /// Give every task cell a grade entry. Returns how many were created.
    fn synthesize_task_grades(&mut self) -> usize {
        let mut created = 0;
        for (cell_id, task) in &self.task_cells_dict {
            if !self.grades_dict.contains_key(cell_id) {
                self.grades_dict
                    .insert(cell_id.clone(), Grade::for_task_cell(task.max_score.clone()));
                created += 1;
            }
        }
        created
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub notebooks: BTreeMap<String, NotebookRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradeBookError {
    #[error("unknown notebook: {notebook}")]
    UnknownNotebook { notebook: String },
    #[error("no grade for cell {cell_id} in notebook {notebook}")]
    UninitializedGrade { notebook: String, cell_id: String },
    #[error("no comment entry for cell {cell_id} in notebook {notebook}")]
    UninitializedComment { notebook: String, cell_id: String },
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidScore { field: &'static str, value: f64 },
    #[error("malformed properties document: {0}")]
    MalformedDocument(String),
}

/// Everything the grading UI shows for one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub notebook: String,
    pub cell_id: String,
    pub score: f64,
    pub max_score: f64,
    pub auto_score: Option<f64>,
    pub manual_score: Option<f64>,
    pub extra_credit: Option<f64>,
    pub needs_manual_grade: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookSummary {
    pub name: String,
    pub points: f64,
    pub max_points: f64,
    pub extra_credits: f64,
    pub needs_manual_grading: bool,
    pub cell_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBookSummary {
    pub points: f64,
    pub max_points: f64,
    pub extra_credits: f64,
    pub needs_manual_grading: bool,
    pub notebooks: Vec<NotebookSummary>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeBook {
    properties: Properties,
}

impl GradeBook {
    /// Take ownership of a document and run `ensure_initialized` on it.
    pub fn new(properties: Properties) -> Self {
        let mut gradebook = Self { properties };
        gradebook.ensure_initialized();
        gradebook
    }

    pub fn from_value(value: Value) -> Result<Self, GradeBookError> {
        let properties: Properties = serde_json::from_value(value)
            .map_err(|e| GradeBookError::MalformedDocument(e.to_string()))?;
        Ok(Self::new(properties))
    }

    /// Synthesize the missing grade entry of every task cell in every
    /// notebook. Returns the number of entries created; a second call
    /// returns zero.
    pub fn ensure_initialized(&mut self) -> usize {
        self.properties
            .notebooks
            .values_mut()
            .map(NotebookRecord::synthesize_task_grades)
            .sum()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn into_properties(self) -> Properties {
        self.properties
    }

    pub fn notebook_names(&self) -> impl Iterator<Item = &str> {
        self.properties.notebooks.keys().map(String::as_str)
    }

    fn notebook(&self, notebook: &str) -> Result<&NotebookRecord, GradeBookError> {
        self.properties
            .notebooks
            .get(notebook)
            .ok_or_else(|| GradeBookError::UnknownNotebook {
                notebook: notebook.to_string(),
            })
    }

    fn notebook_mut(&mut self, notebook: &str) -> Result<&mut NotebookRecord, GradeBookError> {
        self.properties
            .notebooks
            .get_mut(notebook)
            .ok_or_else(|| GradeBookError::UnknownNotebook {
                notebook: notebook.to_string(),
            })
    }

    fn grade(&self, notebook: &str, cell_id: &str) -> Result<&Grade, GradeBookError> {
        self.notebook(notebook)?
            .grades_dict
            .get(cell_id)
            .ok_or_else(|| uninitialized(notebook, cell_id))
    }

    fn grade_mut(&mut self, notebook: &str, cell_id: &str) -> Result<&mut Grade, GradeBookError> {
        self.notebook_mut(notebook)?
            .grades_dict
            .get_mut(cell_id)
            .ok_or_else(|| uninitialized(notebook, cell_id))
    }

    pub fn grade_score(&self, notebook: &str, cell_id: &str) -> Result<f64, GradeBookError> {
        Ok(self.grade(notebook, cell_id)?.score())
    }

    pub fn grade_max_score(&self, notebook: &str, cell_id: &str) -> Result<f64, GradeBookError> {
        Ok(self.grade(notebook, cell_id)?.max_score())
    }

    pub fn notebook_points(&self, notebook: &str) -> Result<f64, GradeBookError> {
        Ok(self.notebook(notebook)?.points())
    }

    /// Fills in task-cell grades the notebook is missing before summing, so
    /// the total stays correct for documents edited after construction.
    pub fn notebook_max_points(&mut self, notebook: &str) -> Result<f64, GradeBookError> {
        let record = self.notebook_mut(notebook)?;
        record.synthesize_task_grades();
        Ok(record.max_points())
    }

    pub fn points(&self) -> f64 {
        self.properties.notebooks.values().map(|n| n.points()).sum()
    }

    pub fn max_points(&mut self) -> f64 {
        self.ensure_initialized();
        self.properties
            .notebooks
            .values()
            .map(|n| n.max_points())
            .sum()
    }

    pub fn extra_credits(&self) -> f64 {
        self.properties
            .notebooks
            .values()
            .map(|n| n.extra_credits())
            .sum()
    }

    /// Creates the grade entry for a task cell that was never graded.
    pub fn set_manual_score(
        &mut self,
        notebook: &str,
        cell_id: &str,
        score: f64,
    ) -> Result<(), GradeBookError> {
        let score = Points::from_score("manual_score", score)?;
        let record = self.notebook_mut(notebook)?;
        if let Some(grade) = record.grades_dict.get_mut(cell_id) {
            grade.manual_score = Some(score);
            return Ok(());
        }
        let Some(task) = record.task_cells_dict.get(cell_id) else {
            return Err(uninitialized(notebook, cell_id));
        };
        let grade = Grade {
            manual_score: Some(score),
            ..Grade::for_task_cell(task.max_score.clone())
        };
        record.grades_dict.insert(cell_id.to_string(), grade);
        Ok(())
    }

    pub fn set_extra_credit(
        &mut self,
        notebook: &str,
        cell_id: &str,
        extra_credit: Option<f64>,
    ) -> Result<(), GradeBookError> {
        let extra_credit = extra_credit
            .map(|v| Points::from_score("extra_credit", v))
            .transpose()?;
        self.grade_mut(notebook, cell_id)?.extra_credit = extra_credit;
        Ok(())
    }

    pub fn set_comment(
        &mut self,
        notebook: &str,
        cell_id: &str,
        comment: Option<String>,
    ) -> Result<(), GradeBookError> {
        let entry = self
            .notebook_mut(notebook)?
            .comments_dict
            .get_mut(cell_id)
            .ok_or_else(|| GradeBookError::UninitializedComment {
                notebook: notebook.to_string(),
                cell_id: cell_id.to_string(),
            })?;
        entry.manual_comment = comment;
        Ok(())
    }

    pub fn set_needs_manual_grading(
        &mut self,
        notebook: &str,
        cell_id: &str,
        needs_manual_grade: bool,
    ) -> Result<(), GradeBookError> {
        self.grade_mut(notebook, cell_id)?.needs_manual_grade = needs_manual_grade;
        Ok(())
    }

    pub fn comment(&self, notebook: &str, cell_id: &str) -> Result<Option<&str>, GradeBookError> {
        Ok(self
            .notebook(notebook)?
            .comments_dict
            .get(cell_id)
            .and_then(|c| c.manual_comment.as_deref()))
    }

    pub fn notebook_grading_info(&self, notebook: &str) -> Result<bool, GradeBookError> {
        Ok(self.notebook(notebook)?.needs_manual_grading())
    }

    pub fn grading_info(&self) -> BTreeMap<String, bool> {
        self.properties
            .notebooks
            .iter()
            .map(|(name, n)| (name.clone(), n.needs_manual_grading()))
            .collect()
    }

    pub fn cell(&self, notebook: &str, cell_id: &str) -> Result<CellView, GradeBookError> {
        let grade = self.grade(notebook, cell_id)?;
        Ok(CellView {
            notebook: notebook.to_string(),
            cell_id: cell_id.to_string(),
            score: grade.score(),
            max_score: grade.max_score(),
            auto_score: grade.auto_score.as_ref().map(Points::value),
            manual_score: grade.manual_score.as_ref().map(Points::value),
            extra_credit: grade.extra_credit.as_ref().map(Points::value),
            needs_manual_grade: grade.needs_manual_grade,
            comment: self.comment(notebook, cell_id)?.map(str::to_string),
        })
    }

    pub fn notebook_summary(&mut self, notebook: &str) -> Result<NotebookSummary, GradeBookError> {
        let max_points = self.notebook_max_points(notebook)?;
        let record = self.notebook(notebook)?;
        Ok(NotebookSummary {
            name: notebook.to_string(),
            points: record.points(),
            max_points,
            extra_credits: record.extra_credits(),
            needs_manual_grading: record.needs_manual_grading(),
            cell_count: record.grades_dict.len(),
        })
    }

    pub fn summary(&mut self) -> GradeBookSummary {
        let max_points = self.max_points();
        let notebooks: Vec<NotebookSummary> = self
            .properties
            .notebooks
            .iter()
            .map(|(name, n)| NotebookSummary {
                name: name.clone(),
                points: n.points(),
                max_points: n.max_points(),
                extra_credits: n.extra_credits(),
                needs_manual_grading: n.needs_manual_grading(),
                cell_count: n.grades_dict.len(),
            })
            .collect();
        GradeBookSummary {
            points: self.points(),
            max_points,
            extra_credits: self.extra_credits(),
            needs_manual_grading: notebooks.iter().any(|n| n.needs_manual_grading),
            notebooks,
        }
    }
}

fn uninitialized(notebook: &str, cell_id: &str) -> GradeBookError {
    GradeBookError::UninitializedGrade {
        notebook: notebook.to_string(),
        cell_id: cell_id.to_string(),
    }
}
