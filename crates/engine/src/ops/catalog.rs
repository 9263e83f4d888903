use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{CatalogItem, ResultEngine, merch};

use super::Engine;

impl Engine {
    /// Look up a purchasable item by its exact name.
    pub async fn item_by_name(&self, name: &str) -> ResultEngine<Option<CatalogItem>> {
        self.find_item(&self.database, name).await
    }

    /// Every purchasable item, ordered by name.
    pub async fn catalog(&self) -> ResultEngine<Vec<CatalogItem>> {
        merch::Entity::find()
            .filter(merch::Column::Deleted.eq(false))
            .order_by_asc(merch::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(CatalogItem::try_from)
            .collect()
    }

    pub(crate) async fn find_item<C: ConnectionTrait>(
        &self,
        db: &C,
        name: &str,
    ) -> ResultEngine<Option<CatalogItem>> {
        merch::Entity::find()
            .filter(merch::Column::Name.eq(name))
            .filter(merch::Column::Deleted.eq(false))
            .one(db)
            .await?
            .map(CatalogItem::try_from)
            .transpose()
    }
}
