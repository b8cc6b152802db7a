pub mod overlay_asset_loader;
