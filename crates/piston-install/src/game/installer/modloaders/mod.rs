pub mod fabric;
pub mod forge;
pub mod quilt;

use crate::game::installer::core::traits::LoaderAdapter;
use crate::game::metadata::ModloaderType;

/// Adapter for a loader, or `None` for vanilla.
pub fn adapter_for(modloader: ModloaderType) -> Option<Box<dyn LoaderAdapter>> {
    match modloader {
        ModloaderType::Vanilla => None,
        ModloaderType::Fabric => Some(Box::new(fabric::FabricAdapter)),
        ModloaderType::Quilt => Some(Box::new(quilt::QuiltAdapter)),
        ModloaderType::Forge => Some(Box::new(forge::ForgeAdapter::new())),
    }
}
