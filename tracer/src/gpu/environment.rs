use crate::gpu::context::Context;
use anyhow::Context as AnyhowContext;
use std::path::Path;
use wgpu::TextureView;

/// Sampled 2-D texture uploaded once at scene construction.
pub(crate) struct DeviceTexture {
    view: TextureView,
}

impl DeviceTexture {
    pub(crate) fn from_file(context: &Context, label: &str, path: &Path) -> anyhow::Result<Self> {
        let bitmap = image::open(path)
            .with_context(|| format!("failed to load texture from {}", path.display()))?
            .to_rgba8();
        let (width, height) = bitmap.dimensions();

        let texture = context.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        context.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bitmap.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );

        Ok(Self { view: texture.create_view(&wgpu::TextureViewDescriptor::default()) })
    }

    #[must_use]
    pub(crate) fn view(&self) -> &TextureView {
        &self.view
    }
}

/// What the shading stage samples on a ray miss. A scene without a configured
/// environment asset reuses the previously presented frame as a cheap
/// pseudo-environment; the selection is made once per frame, not buried in a
/// null-coalescing expression at bind time.
pub(crate) enum EnvironmentSource<'a> {
    Configured(&'a TextureView),
    DisplaySurface(&'a TextureView),
}

impl<'a> EnvironmentSource<'a> {
    #[must_use]
    pub(crate) fn resolve(configured: Option<&'a DeviceTexture>, display_surface: &'a TextureView) -> Self {
        match configured {
            Some(environment) => Self::Configured(environment.view()),
            None => Self::DisplaySurface(display_surface),
        }
    }

    #[must_use]
    pub(crate) fn view(&self) -> &'a TextureView {
        match *self {
            Self::Configured(view) => view,
            Self::DisplaySurface(view) => view,
        }
    }
}
