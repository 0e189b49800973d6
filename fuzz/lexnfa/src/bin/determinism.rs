use fuzz_lexnfa::Input;

fn main() {
    afl::fuzz!(|data: Input| {
        fuzz_lexnfa::run(&data);
    });
}
