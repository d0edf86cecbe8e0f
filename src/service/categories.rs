//! Category accessors.

use super::Forum;
use crate::error::Result;
use crate::model::Category;
use crate::tables;
use tracing::info;

impl Forum {
    /// Looks up a category by id.
    pub fn category_get_by_id(&self, cid: u64) -> Result<Category> {
        self.get_record(tables::CATEGORY, cid)
    }

    /// Stores a category, allocating an id when it has none.
    pub fn category_set(&self, mut category: Category) -> Result<Category> {
        if category.id == 0 {
            category.id = self.store.next_sequence(tables::CATEGORY)?;
            info!(id = category.id, "Category created");
        }
        self.put_record(tables::CATEGORY, category.id, &category)?;
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_set_allocates_once() {
        let forum = Forum::in_memory();
        let mut category = forum
            .category_set(Category {
                name: "General".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(category.id, 1);

        category.about = "Anything goes".into();
        let saved = forum.category_set(category).unwrap();
        assert_eq!(saved.id, 1);
        assert_eq!(forum.category_get_by_id(1).unwrap().about, "Anything goes");
        assert!(forum.category_get_by_id(2).unwrap_err().is_not_found());
    }
}
