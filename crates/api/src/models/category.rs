//! Category domain types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::CategoryId;

/// A catalog category. Categories form a tree through `parent_id`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category with its children nested.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Nest a flat list of categories into trees.
    ///
    /// Sibling order follows the input order. Categories whose parent is not
    /// in the list (e.g. an inactive parent) are dropped along with their
    /// subtree.
    #[must_use]
    pub fn build_tree(categories: Vec<Category>) -> Vec<Self> {
        let mut children_of: HashMap<Option<CategoryId>, Vec<Category>> = HashMap::new();
        for category in categories {
            children_of.entry(category.parent_id).or_default().push(category);
        }
        Self::attach(None, &mut children_of)
    }

    fn attach(
        parent: Option<CategoryId>,
        children_of: &mut HashMap<Option<CategoryId>, Vec<Category>>,
    ) -> Vec<Self> {
        let Some(children) = children_of.remove(&parent) else {
            return Vec::new();
        };
        children
            .into_iter()
            .map(|category| {
                let children = Self::attach(Some(category.id), children_of);
                Self { category, children }
            })
            .collect()
    }
}

/// Payload for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Partial category update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i32, parent: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id),
            name: format!("Category {id}"),
            slug: format!("category-{id}"),
            description: None,
            parent_id: parent.map(CategoryId::new),
            image_url: None,
            is_active: true,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_tree_nests_children_in_order() {
        let tree = CategoryNode::build_tree(vec![
            category(1, None),
            category(2, Some(1)),
            category(3, Some(1)),
            category(4, Some(3)),
            category(5, None),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.id, CategoryId::new(1));
        let child_ids: Vec<_> = tree[0].children.iter().map(|c| c.category.id.as_i32()).collect();
        assert_eq!(child_ids, vec![2, 3]);
        assert_eq!(tree[0].children[1].children[0].category.id, CategoryId::new(4));
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_build_tree_drops_orphans() {
        let tree = CategoryNode::build_tree(vec![category(1, None), category(7, Some(99))]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }
}
