mod completion;
mod csv_sink;
mod dedupe;
mod normalize;
mod page_extractor;
mod pdf_text;
mod pipeline;
mod prompt;
mod run;

pub use run::run;

use completion::*;
use csv_sink::*;
use dedupe::*;
use normalize::*;
use page_extractor::*;
use pdf_text::*;
use pipeline::*;
use prompt::*;
