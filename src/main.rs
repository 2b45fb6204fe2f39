fn main() {
    humilog_lib::run()
}
