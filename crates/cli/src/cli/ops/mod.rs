pub mod grant;
pub mod init;
pub mod show;
pub mod version;

pub use grant::Grant;
pub use init::Init;
pub use show::Show;
pub use version::Version;
