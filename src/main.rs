fn main() -> ramp_init::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = ramp_init::get_options();
    let image = ramp_init::render(options.backend, options.width, options.height)?;
    ramp_init::write_image(&options, &image)
}
