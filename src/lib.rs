pub use folio_core::*;

#[cfg(feature = "server")]
pub mod server {
    pub use folio_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use folio_client::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    pub use folio_fs::*;
}

#[cfg(feature = "mock_auth")]
pub mod auth_mock {
    pub use folio_auth_mock::*;
}

#[cfg(feature = "opendal")]
pub mod opendal {
    pub use folio_opendal::*;
}

pub mod prelude {
    pub use folio_core::prelude::*;

    #[cfg(feature = "server")]
    pub use folio_server::prelude::*;

    #[cfg(feature = "client")]
    pub use folio_client::{
        FolioClient, HttpProbe, RestRecordStore, ThumbnailServiceClient, VideoCatalogClient,
    };

    #[cfg(feature = "fs")]
    pub use folio_fs::FileSystemStorage;

    #[cfg(feature = "mock_auth")]
    pub use folio_auth_mock::AllowAllAuth;

    #[cfg(feature = "opendal")]
    pub use folio_opendal::OpendalStorage;
}
