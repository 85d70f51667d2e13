//! Model backends behind the predictor and ranker traits.
pub mod remote;

#[cfg(feature = "transformers")]
mod bert;
#[cfg(feature = "transformers")]
mod gpt2;

#[cfg(feature = "transformers")]
pub use bert::BertMaskedLm;
#[cfg(feature = "transformers")]
pub use gpt2::Gpt2Scorer;
pub use remote::RemoteMaskedLm;

#[cfg(feature = "transformers")]
use std::path::{Path, PathBuf};

#[cfg(feature = "transformers")]
use rust_bert::resources::{LocalResource, RemoteResource, ResourceProvider};

#[cfg(feature = "transformers")]
pub fn device(cuda: bool) -> tch::Device {
    if cuda && tch::Cuda::is_available() {
        tch::Device::Cuda(0)
    } else {
        tch::Device::Cpu
    }
}

/// A model file from a local directory, or the pretrained resource when no
/// directory is given.
#[cfg(feature = "transformers")]
fn model_file(
    local_dir: Option<&Path>,
    file_name: &str,
    pretrained: (&'static str, &'static str),
) -> crate::error::Result<PathBuf> {
    let resource: Box<dyn ResourceProvider> = match local_dir {
        Some(dir) => Box::new(LocalResource::from(dir.join(file_name))),
        None => Box::new(RemoteResource::from_pretrained(pretrained)),
    };
    Ok(resource.get_local_path()?)
}
