fn main()
{
        if let Err(err) = patina::run()
        {
                log::error!("{err:#}");
                eprintln!("patina: {err:#}");

                std::process::exit(1);
        }
}
