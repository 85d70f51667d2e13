use std::path::Path;

use log::info;
use rust_bert::bert::{
    BertConfig, BertConfigResources, BertForMaskedLM, BertModelResources, BertVocabResources,
};
use rust_bert::Config;
use rust_tokenizers::tokenizer::{BertTokenizer, Tokenizer};
use rust_tokenizers::vocab::Vocab;
use tch::{nn, no_grad, Device, Kind, Tensor};

use super::model_file;
use crate::error::Result;
use crate::predictor::{MaskedLanguageModel, MaskedPrediction, MaskedQuery, MASK_TOKEN};

pub const DEFAULT_MODEL: &str = "bert-base-uncased";

const PARAPHRASE_OPEN: &str = "<paraphrase>";
const PARAPHRASE_CLOSE: &str = "</paraphrase>";

pub struct BertMaskedLm {
    model: BertForMaskedLM,
    tokenizer: BertTokenizer,
    device: Device,
    paraphraser: bool,
    _vs: nn::VarStore,
}

/// Token ids of a sentence plus where the target word landed.
struct Encoded {
    ids: Vec<i64>,
    target: Option<usize>,
}

impl BertMaskedLm {
    /// `name_or_path` is either the default pretrained model name or a local
    /// directory with `config.json`, `vocab.txt` and `rust_model.ot`.
    pub fn load(name_or_path: &str, device: Device, paraphraser: bool) -> Result<Self> {
        let local_dir = (name_or_path != DEFAULT_MODEL).then(|| Path::new(name_or_path));
        let config_path = model_file(local_dir, "config.json", BertConfigResources::BERT)?;
        let vocab_path = model_file(local_dir, "vocab.txt", BertVocabResources::BERT)?;
        let weights_path = model_file(local_dir, "rust_model.ot", BertModelResources::BERT)?;

        let config = BertConfig::from_file(config_path);
        let tokenizer = BertTokenizer::from_file(&vocab_path, true, true)?;
        let mut vs = nn::VarStore::new(device);
        let model = BertForMaskedLM::new(vs.root(), &config);
        vs.load(&weights_path)?;
        info!("loaded masked model {name_or_path} on {device:?}");

        Ok(BertMaskedLm {
            model,
            tokenizer,
            device,
            paraphraser,
            _vs: vs,
        })
    }

    fn special(&self, token: &str) -> i64 {
        self.tokenizer.vocab().token_to_id(token)
    }

    /// Word-piece ids of `words`; `target` is set when `words[position]` is exactly one piece.
    fn encode(&self, words: &[String], position: usize) -> Encoded {
        let mut ids = Vec::new();
        let mut target = None;
        for (i, word) in words.iter().enumerate() {
            let pieces = if word == MASK_TOKEN {
                vec![self.special(MASK_TOKEN)]
            } else {
                let tokens = self.tokenizer.tokenize(word);
                self.tokenizer.convert_tokens_to_ids(&tokens)
            };
            if i == position && pieces.len() == 1 {
                target = Some(ids.len());
            }
            ids.extend(pieces);
        }
        Encoded { ids, target }
    }

    fn markers(&self) -> Markers {
        Markers {
            cls: self.special("[CLS]"),
            sep: self.special("[SEP]"),
            open: self.special(PARAPHRASE_OPEN),
            close: self.special(PARAPHRASE_CLOSE),
        }
    }

    fn build_input(&self, query: &MaskedQuery<'_>) -> Option<InputLayout> {
        let masked = self.encode(query.input, query.position);
        if self.paraphraser {
            let original = self.encode(query.original, query.position);
            paraphrase_layout(&self.markers(), &original, &masked)
        } else {
            plain_layout(&self.markers(), &masked)
        }
    }
}

struct Markers {
    cls: i64,
    sep: i64,
    open: i64,
    close: i64,
}

/// Input ids, segment ids and position ids, plus the index to read predictions from.
#[derive(Debug, PartialEq, Eq)]
struct InputLayout {
    ids: Vec<i64>,
    segments: Vec<i64>,
    positions: Vec<i64>,
    target: usize,
}

/// `[CLS] sentence [SEP]`
fn plain_layout(markers: &Markers, masked: &Encoded) -> Option<InputLayout> {
    let target = masked.target? + 1;
    let mut ids = vec![markers.cls];
    ids.extend(&masked.ids);
    ids.push(markers.sep);
    let len = ids.len();
    Some(InputLayout {
        ids,
        segments: vec![0; len],
        positions: (0..len as i64).collect(),
        target,
    })
}

/// `[CLS] sentence <paraphrase> masked sentence </paraphrase> [SEP]`
///
/// Segment 0 runs up to and including `<paraphrase>`; positions restart
/// right after it.
fn paraphrase_layout(markers: &Markers, original: &Encoded, masked: &Encoded) -> Option<InputLayout> {
    let mut ids = vec![markers.cls];
    ids.extend(&original.ids);
    ids.push(markers.open);
    let middle = ids.len();
    let target = middle + masked.target?;
    ids.extend(&masked.ids);
    ids.push(markers.close);
    ids.push(markers.sep);

    let second = ids.len() - middle;
    let mut segments = vec![0; middle];
    segments.extend(std::iter::repeat(1).take(second));
    let mut positions: Vec<i64> = (0..middle as i64).collect();
    positions.extend(0..second as i64);
    Some(InputLayout {
        ids,
        segments,
        positions,
        target,
    })
}

impl MaskedLanguageModel for BertMaskedLm {
    fn top_tokens(&self, query: &MaskedQuery<'_>, top_n: usize) -> Result<Vec<MaskedPrediction>> {
        let Some(layout) = self.build_input(query) else {
            return Ok(Vec::new());
        };
        let as_batch = |v: &[i64]| Tensor::from_slice(v).view((1, -1)).to(self.device);
        let input_ids = as_batch(&layout.ids);
        let segment_ids = as_batch(&layout.segments);
        let position_ids = as_batch(&layout.positions);

        let output = no_grad(|| {
            self.model.forward_t(
                Some(&input_ids),
                None,
                Some(&segment_ids),
                Some(&position_ids),
                None,
                None,
                None,
                false,
            )
        });
        let probs = output
            .prediction_scores
            .get(0)
            .get(layout.target as i64)
            .softmax(-1, Kind::Float);
        let vocab_size = probs.size()[0];
        let (scores, indices) = probs.topk((top_n as i64).min(vocab_size), -1, true, true);

        let scores = Vec::<f64>::try_from(&scores.to_kind(Kind::Double))?;
        let indices = Vec::<i64>::try_from(&indices)?;
        Ok(indices
            .iter()
            .zip(scores)
            .map(|(id, score)| MaskedPrediction {
                token: self.tokenizer.vocab().id_to_token(id),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKERS: Markers = Markers {
        cls: 101,
        sep: 102,
        open: 900,
        close: 901,
    };
    const MASK: i64 = 103;

    // "which restaurant [MASK] italian food ?" with "restaurant" split in two pieces
    fn masked() -> Encoded {
        Encoded {
            ids: vec![11, 12, 13, MASK, 14, 15, 16],
            target: Some(3),
        }
    }

    fn original() -> Encoded {
        Encoded {
            ids: vec![11, 12, 13, 20, 14, 15, 16],
            target: Some(3),
        }
    }

    #[test]
    fn plain_layout_is_one_segment() {
        let layout = plain_layout(&MARKERS, &masked()).unwrap();
        assert_eq!(layout.ids, vec![101, 11, 12, 13, MASK, 14, 15, 16, 102]);
        assert_eq!(layout.segments, vec![0i64; 9]);
        assert_eq!(layout.positions, (0..9).collect::<Vec<i64>>());
        assert_eq!(layout.ids[layout.target], MASK);
    }

    #[test]
    fn paraphrase_layout_switches_segment_after_the_marker() {
        let layout = paraphrase_layout(&MARKERS, &original(), &masked()).unwrap();
        // [CLS] + 7 pieces, then the marker at index 8
        let marker = layout.ids.iter().position(|&id| id == 900).unwrap();
        assert_eq!(marker, 8);
        assert_eq!(layout.ids.len(), 18);
        assert_eq!(layout.ids[16..], [901i64, 102]);

        // segment 0 up to and including the marker
        assert_eq!(layout.segments[..=marker], vec![0i64; marker + 1][..]);
        assert_eq!(layout.segments[marker + 1..], vec![1i64; 18 - marker - 1][..]);

        // positions restart after the marker
        let mut positions: Vec<i64> = (0..=marker as i64).collect();
        positions.extend(0..(18 - marker - 1) as i64);
        assert_eq!(layout.positions, positions);

        // the target is looked up in the second half only
        assert_eq!(layout.target, marker + 1 + 3);
        assert_eq!(layout.ids[layout.target], MASK);
    }

    #[test]
    fn split_target_word_yields_no_input() {
        let split = Encoded {
            ids: vec![11, 12, 13],
            target: None,
        };
        assert!(plain_layout(&MARKERS, &split).is_none());
        assert!(paraphrase_layout(&MARKERS, &original(), &split).is_none());
    }
}
