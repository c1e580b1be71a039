mod merge;
mod recording;
mod trace_demo;
