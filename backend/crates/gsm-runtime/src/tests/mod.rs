mod cache_copy;
mod output_parser;
mod steamcmd;
mod support;
