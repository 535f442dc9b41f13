use crate::jwt::JwtService;
use folio_core::prelude::*;

#[derive(Clone)]
pub struct AppState<S, R, G, P, A>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    pub library: AssetLibrary<S, R, G, P>,
    pub auth: A,
    pub jwt_service: JwtService,
    pub breakpoints: Breakpoints,
}
