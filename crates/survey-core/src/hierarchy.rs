// SPDX-License-Identifier: BUSL-1.1
//! # Hierarchy Propagation
//!
//! Every level below a department stores the codes of all its ancestors,
//! and [`SubCategory`] rows also copy each ancestor's description and
//! weightage. When an ancestor is edited, [`plan`] stages two kinds of
//! rewrite against the rows that sat under the ancestor's *previous* code
//! path:
//!
//! - a code rename is carried into every deeper intermediate level
//!   (sub-departments, sub-sub-departments, categories), so later edits at
//!   those levels still find their sub-categories;
//! - the ancestor's copy inside every sub-category is overwritten.
//!
//! Planning reads and validates only. [`Cascade::commit`] writes the staged
//! rows, one collection at a time.

use crate::error::CoreResult;
use crate::model::{Category, Department, Record, SubCategory, SubDepartment, SubSubDepartment};
use crate::store::{Collection, Staged};
use crate::Document;

/// The collections below the department level.
#[derive(Debug, Clone, Default)]
pub struct DepartmentTree {
    pub sub_departments: Collection<SubDepartment>,
    pub sub_sub_departments: Collection<SubSubDepartment>,
    pub categories: Collection<Category>,
    pub sub_categories: Collection<SubCategory>,
}

/// A row placed in the department tree by its code path.
pub trait Node: Document {
    /// Codes from the department down to this row, outermost first.
    fn path(&self) -> Vec<&str>;

    /// Overwrite the code at `depth` (0 is the department).
    fn set_code(&mut self, depth: usize, code: &str);

    /// Whether this row sits at or below `prefix`.
    fn under(&self, prefix: &[&str]) -> bool {
        self.path().starts_with(prefix)
    }
}

impl Node for Department {
    fn path(&self) -> Vec<&str> {
        vec![self.department_code.as_str()]
    }

    fn set_code(&mut self, depth: usize, code: &str) {
        if depth == 0 {
            self.department_code = code.to_string();
        }
    }
}

impl Node for SubDepartment {
    fn path(&self) -> Vec<&str> {
        vec![self.department_code.as_str(), self.sub_department_code.as_str()]
    }

    fn set_code(&mut self, depth: usize, code: &str) {
        match depth {
            0 => self.department_code = code.to_string(),
            1 => self.sub_department_code = code.to_string(),
            _ => {}
        }
    }
}

impl Node for SubSubDepartment {
    fn path(&self) -> Vec<&str> {
        vec![
            self.department_code.as_str(),
            self.sub_department_code.as_str(),
            self.sub_sub_department_code.as_str(),
        ]
    }

    fn set_code(&mut self, depth: usize, code: &str) {
        match depth {
            0 => self.department_code = code.to_string(),
            1 => self.sub_department_code = code.to_string(),
            2 => self.sub_sub_department_code = code.to_string(),
            _ => {}
        }
    }
}

impl Node for Category {
    fn path(&self) -> Vec<&str> {
        vec![
            self.department_code.as_str(),
            self.sub_department_code.as_str(),
            self.sub_sub_department_code.as_str(),
            self.category_code.as_str(),
        ]
    }

    fn set_code(&mut self, depth: usize, code: &str) {
        match depth {
            0 => self.department_code = code.to_string(),
            1 => self.sub_department_code = code.to_string(),
            2 => self.sub_sub_department_code = code.to_string(),
            3 => self.category_code = code.to_string(),
            _ => {}
        }
    }
}

impl Node for SubCategory {
    fn path(&self) -> Vec<&str> {
        vec![
            self.department_code.as_str(),
            self.sub_department_code.as_str(),
            self.sub_sub_department_code.as_str(),
            self.category_code.as_str(),
            self.sub_category_code.as_str(),
        ]
    }

    fn set_code(&mut self, depth: usize, code: &str) {
        match depth {
            0 => self.department_code = code.to_string(),
            1 => self.sub_department_code = code.to_string(),
            2 => self.sub_sub_department_code = code.to_string(),
            3 => self.category_code = code.to_string(),
            4 => self.sub_category_code = code.to_string(),
            _ => {}
        }
    }
}

/// An ancestor level whose fields are denormalized into [`SubCategory`].
pub trait Ancestor: Node + PartialEq {
    /// Overwrite this ancestor's copy inside `sc`, codes included.
    fn write_into(&self, sc: &mut SubCategory);

    /// Stage the rename `from` → `to` in the intermediate levels deeper
    /// than this one.
    fn stage_renames(cascade: &mut Cascade, from: &[&str], to: &[String]) -> CoreResult<()>;
}

impl Ancestor for Department {
    fn write_into(&self, sc: &mut SubCategory) {
        sc.department_code.clone_from(&self.department_code);
        sc.department_group_code.clone_from(&self.department_group_code);
        sc.department_description.clone_from(&self.department_description);
        sc.department_weightage = self.department_weightage;
    }

    fn stage_renames(cascade: &mut Cascade, from: &[&str], to: &[String]) -> CoreResult<()> {
        cascade.sub_departments = stage_rename(&cascade.tree.sub_departments, from, to)?;
        cascade.sub_sub_departments = stage_rename(&cascade.tree.sub_sub_departments, from, to)?;
        cascade.categories = stage_rename(&cascade.tree.categories, from, to)?;
        Ok(())
    }
}

impl Ancestor for SubDepartment {
    fn write_into(&self, sc: &mut SubCategory) {
        sc.department_code.clone_from(&self.department_code);
        sc.sub_department_code.clone_from(&self.sub_department_code);
        sc.sub_department_description.clone_from(&self.sub_department_description);
        sc.sub_department_weightage = self.sub_department_weightage;
    }

    fn stage_renames(cascade: &mut Cascade, from: &[&str], to: &[String]) -> CoreResult<()> {
        cascade.sub_sub_departments = stage_rename(&cascade.tree.sub_sub_departments, from, to)?;
        cascade.categories = stage_rename(&cascade.tree.categories, from, to)?;
        Ok(())
    }
}

impl Ancestor for SubSubDepartment {
    fn write_into(&self, sc: &mut SubCategory) {
        sc.department_code.clone_from(&self.department_code);
        sc.sub_department_code.clone_from(&self.sub_department_code);
        sc.sub_sub_department_code.clone_from(&self.sub_sub_department_code);
        sc.sub_sub_department_description
            .clone_from(&self.sub_sub_department_description);
        sc.sub_sub_department_weightage = self.sub_sub_department_weightage;
    }

    fn stage_renames(cascade: &mut Cascade, from: &[&str], to: &[String]) -> CoreResult<()> {
        cascade.categories = stage_rename(&cascade.tree.categories, from, to)?;
        Ok(())
    }
}

impl Ancestor for Category {
    fn write_into(&self, sc: &mut SubCategory) {
        sc.department_code.clone_from(&self.department_code);
        sc.sub_department_code.clone_from(&self.sub_department_code);
        sc.sub_sub_department_code.clone_from(&self.sub_sub_department_code);
        sc.category_code.clone_from(&self.category_code);
        sc.category_description.clone_from(&self.category_description);
        sc.category_weightage = self.category_weightage;
        sc.category_display_order = self.category_display_order;
    }

    fn stage_renames(_cascade: &mut Cascade, _from: &[&str], _to: &[String]) -> CoreResult<()> {
        Ok(())
    }
}

fn stage_rename<N: Node>(
    nodes: &Collection<N>,
    from: &[&str],
    to: &[String],
) -> CoreResult<Staged<N>> {
    nodes.stage_where(
        |n| n.under(from),
        |n| {
            for (depth, code) in to.iter().enumerate() {
                n.set_code(depth, code);
            }
        },
    )
}

/// Validated, not yet written rewrites caused by one ancestor edit.
#[derive(Debug)]
pub struct Cascade {
    tree: DepartmentTree,
    sub_departments: Staged<SubDepartment>,
    sub_sub_departments: Staged<SubSubDepartment>,
    categories: Staged<Category>,
    sub_categories: Staged<SubCategory>,
}

/// Rows written by [`Cascade::commit`], per collection.
#[derive(Debug, Default)]
pub struct Propagated {
    pub sub_departments: Vec<Record<SubDepartment>>,
    pub sub_sub_departments: Vec<Record<SubSubDepartment>>,
    pub categories: Vec<Record<Category>>,
    pub sub_categories: Vec<Record<SubCategory>>,
}

impl Propagated {
    pub fn len(&self) -> usize {
        self.sub_departments.len()
            + self.sub_sub_departments.len()
            + self.categories.len()
            + self.sub_categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cascade {
    fn empty(tree: &DepartmentTree) -> Self {
        Self {
            tree: tree.clone(),
            sub_departments: Vec::new(),
            sub_sub_departments: Vec::new(),
            categories: Vec::new(),
            sub_categories: Vec::new(),
        }
    }

    /// Number of staged rows.
    pub fn len(&self) -> usize {
        self.sub_departments.len()
            + self.sub_sub_departments.len()
            + self.categories.len()
            + self.sub_categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every staged row.
    pub fn commit(self) -> Propagated {
        let propagated = Propagated {
            sub_departments: self.tree.sub_departments.commit_staged(self.sub_departments),
            sub_sub_departments: self
                .tree
                .sub_sub_departments
                .commit_staged(self.sub_sub_departments),
            categories: self.tree.categories.commit_staged(self.categories),
            sub_categories: self.tree.sub_categories.commit_staged(self.sub_categories),
        };
        if !propagated.is_empty() {
            tracing::info!(
                sub_departments = propagated.sub_departments.len(),
                sub_sub_departments = propagated.sub_sub_departments.len(),
                categories = propagated.categories.len(),
                sub_categories = propagated.sub_categories.len(),
                "propagated ancestor edit"
            );
        }
        propagated
    }
}

/// Stage the rewrites `before` → `after` requires below an ancestor.
///
/// Empty when the ancestor did not change. Fails without staging anything
/// when a rewritten row would not validate.
pub fn plan<A: Ancestor>(tree: &DepartmentTree, before: &A, after: &A) -> CoreResult<Cascade> {
    let mut cascade = Cascade::empty(tree);
    if before == after {
        return Ok(cascade);
    }

    let from = before.path();
    let to: Vec<String> = after.path().into_iter().map(str::to_string).collect();
    if from != after.path() {
        A::stage_renames(&mut cascade, &from, &to)?;
    }
    cascade.sub_categories = tree
        .sub_categories
        .stage_where(|sc| sc.under(&from), |sc| after.write_into(sc))?;
    Ok(cascade)
}
