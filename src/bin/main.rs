fn main() {
    mtp_pool::main();
}
