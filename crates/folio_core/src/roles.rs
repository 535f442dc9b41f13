use crate::error::FolioError;
use crate::model::{Asset, AssetFilter, AssetId, CategoryId, Role};
use crate::traits::RecordStore;
use tracing::{info, instrument, warn};

/// Keeps role flags single-holder per scope through write discipline.
///
/// Promotion is two sequential writes (clear holders, then set target) with no transaction.
/// A failure between them leaves the role without a holder until the next promotion.
#[derive(Clone)]
pub struct RoleResolver<R: RecordStore> {
    records: R,
}

impl<R: RecordStore> RoleResolver<R> {
    pub fn new(records: R) -> Self {
        Self { records }
    }

    fn check_scope(role: Role, scope: Option<CategoryId>) -> Result<(), FolioError> {
        match (role.is_scoped(), scope) {
            (true, None) => Err(FolioError::InvalidScope(format!(
                "{role} requires a category"
            ))),
            (false, Some(category)) => Err(FolioError::InvalidScope(format!(
                "{role} is global, got category {category}"
            ))),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self))]
    pub async fn promote_to_role(
        &self,
        asset_id: AssetId,
        role: Role,
        scope: Option<CategoryId>,
    ) -> Result<Asset, FolioError> {
        Self::check_scope(role, scope)?;

        let mut target = self
            .records
            .get_asset(asset_id)
            .await?
            .ok_or(FolioError::AssetNotFound(asset_id))?;

        if let Some(category) = scope.filter(|category| target.category_id != Some(*category)) {
            return Err(FolioError::InvalidScope(format!(
                "asset {asset_id} is not in category {category}"
            )));
        }

        let holders = self
            .records
            .list_assets(AssetFilter::role(role, scope))
            .await?;
        for holder in holders.iter().filter(|holder| holder.id != asset_id) {
            info!(previous = holder.id, "Clearing {role}");
            self.records.set_role_flag(holder.id, role, false).await?;
        }

        self.records.set_role_flag(asset_id, role, true).await?;
        target.roles.set(role, true);
        info!("Promoted asset {asset_id} to {role}");

        Ok(target)
    }

    /// The current holder of `role`, if any.
    ///
    /// Should the store ever report several holders, the newest one wins.
    pub async fn get_role_holder(
        &self,
        role: Role,
        scope: Option<CategoryId>,
    ) -> Result<Option<Asset>, FolioError> {
        Self::check_scope(role, scope)?;

        let holders = self
            .records
            .list_assets(AssetFilter::role(role, scope))
            .await?;
        if holders.len() > 1 {
            warn!(
                count = holders.len(),
                "Multiple holders of {role}, picking the newest"
            );
        }

        Ok(holders
            .into_iter()
            .max_by_key(|asset| (asset.created_at, asset.id)))
    }
}
