//! Tantivy analyzer pipelines used for keyword scoring and TF-IDF features.

use tantivy::tokenizer::{LowerCaser, RegexTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

use evidex_core::error::{Error, Result};

/// Stop words removed before BM25 scoring.
pub const KEYWORD_STOP_WORDS: &[&str] = &[
	"the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "as", "is", "was", "are",
	"were", "been", "be", "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might", "must",
	"can", "shall", "it", "this", "that", "these", "those", "i", "you", "he", "she", "we", "they", "them",
];

/// Standard English stop list for TF-IDF feature extraction.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
	"a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost", "alone", "along", "already",
	"also", "although", "always", "am", "among", "amongst", "amoungst", "amount", "an", "and", "another", "any", "anyhow",
	"anyone", "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
	"becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
	"beyond", "bill", "both", "bottom", "but", "by", "call", "can", "cannot", "cant", "co", "con", "could", "couldnt", "cry",
	"de", "describe", "detail", "do", "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
	"elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything", "everywhere", "except", "few",
	"fifteen", "fifty", "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty", "found", "four", "from",
	"front", "full", "further", "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here", "hereafter",
	"hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "hundred", "i", "ie", "if",
	"in", "inc", "indeed", "interest", "into", "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least",
	"less", "ltd", "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly",
	"move", "much", "must", "my", "myself", "name", "namely", "neither", "never", "nevertheless", "next", "nine", "no",
	"nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only",
	"onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part", "per", "perhaps",
	"please", "put", "rather", "re", "same", "see", "seem", "seemed", "seeming", "seems", "serious", "several", "she",
	"should", "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something",
	"sometime", "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the", "their", "them",
	"themselves", "then", "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
	"thick", "thin", "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together",
	"too", "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon", "us", "very", "via",
	"was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
	"whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
	"whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

fn build(pattern: &str, stop_words: &[&str]) -> Result<TextAnalyzer> {
	let tokenizer = RegexTokenizer::new(pattern).map_err(|e| Error::Operation(format!("tokenizer pattern '{pattern}': {e}")))?;
	Ok(TextAnalyzer::builder(tokenizer)
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.iter().map(|s| (*s).to_string())))
		.build())
}

/// A cloneable tokenizer pipeline plus a minimum token length in chars.
#[derive(Clone)]
pub struct Analyzer {
	inner: TextAnalyzer,
	min_chars: usize,
}

impl Analyzer {
	/// Word runs, lowercased, keyword stop words removed, tokens of two
	/// chars or fewer dropped.
	pub fn keyword() -> Result<Self> {
		Ok(Self { inner: build(r"\w+", KEYWORD_STOP_WORDS)?, min_chars: 3 })
	}

	/// Word runs of at least two chars, lowercased, English stop words removed.
	pub fn tfidf() -> Result<Self> {
		Ok(Self { inner: build(r"\w\w+", ENGLISH_STOP_WORDS)?, min_chars: 2 })
	}

	pub fn tokenize(&self, text: &str) -> Vec<String> {
		// token_stream needs &mut, clones are cheap
		let mut analyzer = self.inner.clone();
		let mut stream = analyzer.token_stream(text);
		let mut out = Vec::new();
		let min = self.min_chars;
		stream.process(&mut |tok| {
			if tok.text.chars().count() >= min {
				out.push(tok.text.clone());
			}
		});
		out
	}
}

impl std::fmt::Debug for Analyzer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Analyzer").field("min_chars", &self.min_chars).finish_non_exhaustive()
	}
}
