use std::path::Path;

use log::info;
use rust_bert::gpt2::{
    GPT2LMHeadModel, Gpt2Config, Gpt2ConfigResources, Gpt2MergesResources, Gpt2ModelResources,
    Gpt2VocabResources,
};
use rust_bert::Config;
use rust_tokenizers::tokenizer::{Gpt2Tokenizer, Tokenizer};
use rust_tokenizers::vocab::Vocab;
use tch::{nn, no_grad, Device, Kind, Tensor};

use super::model_file;
use crate::error::{Error, Result};
use crate::ranker::LanguageModelScorer;

pub const DEFAULT_MODEL: &str = "gpt2";

const BOS: &str = "<|endoftext|>";

pub struct Gpt2Scorer {
    model: GPT2LMHeadModel,
    tokenizer: Gpt2Tokenizer,
    device: Device,
    _vs: nn::VarStore,
}

impl Gpt2Scorer {
    /// `name_or_path` is either `gpt2` or a local directory with `config.json`,
    /// `vocab.json`, `merges.txt` and `rust_model.ot`.
    pub fn load(name_or_path: &str, device: Device) -> Result<Self> {
        let local_dir = (name_or_path != DEFAULT_MODEL).then(|| Path::new(name_or_path));
        let config_path = model_file(local_dir, "config.json", Gpt2ConfigResources::GPT2)?;
        let vocab_path = model_file(local_dir, "vocab.json", Gpt2VocabResources::GPT2)?;
        let merges_path = model_file(local_dir, "merges.txt", Gpt2MergesResources::GPT2)?;
        let weights_path = model_file(local_dir, "rust_model.ot", Gpt2ModelResources::GPT2)?;

        let config = Gpt2Config::from_file(config_path);
        let tokenizer = Gpt2Tokenizer::from_file(&vocab_path, &merges_path, false)?;
        let mut vs = nn::VarStore::new(device);
        let model = GPT2LMHeadModel::new(vs.root(), &config);
        vs.load(&weights_path)?;
        info!("loaded ranker model {name_or_path} on {device:?}");

        Ok(Gpt2Scorer {
            model,
            tokenizer,
            device,
            _vs: vs,
        })
    }
}

impl LanguageModelScorer for Gpt2Scorer {
    fn perplexity(&self, sentence: &str) -> Result<f64> {
        let tokens = self.tokenizer.tokenize(sentence);
        if tokens.is_empty() {
            return Err(Error::Model(format!("nothing to score in {sentence:?}")));
        }
        // the leading BOS lets the first word be scored too
        let mut ids = vec![self.tokenizer.vocab().token_to_id(BOS)];
        ids.extend(self.tokenizer.convert_tokens_to_ids(&tokens));

        let input_ids = Tensor::from_slice(&ids).to(self.device).unsqueeze(0);
        let seq_len = input_ids.size()[1];
        let labels = input_ids.slice(1, 1, seq_len, 1);

        let output = no_grad(|| {
            self.model.forward_t(
                Some(&input_ids), // input_ids
                None,             // past
                None,             // attention_mask
                None,             // token_type_ids
                None,             // position_ids
                None,             // input_embeds
                None,             // encoder_outputs
                None,             // decoder_input_ids
                false,            // train
            )
        })?;

        let nll = output
            .lm_logits
            .slice(1, 0, seq_len - 1, 1)
            .log_softmax(-1, Kind::Float)
            .gather(-1, &labels.unsqueeze(-1), false)
            .squeeze_dim(-1)
            .neg();
        Ok(nll.mean(Kind::Float).exp().double_value(&[]))
    }
}
