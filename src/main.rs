use clap::{arg,crate_version,Command};
use bounded_lzw::{alphabet::Alphabet,codec,Options,Policy};

const RCH: &str = "unreachable was reached";

const POLICIES: [(&str,Policy,&str);6] = [
    ("freeze",Policy::Freeze,"stop adding entries once the dictionary fills"),
    ("reset",Policy::Reset,"restart the dictionary once it fills"),
    ("lfu",Policy::Lfu,"evict the least frequently used entry"),
    ("lru",Policy::Lru,"evict the least recently used entry"),
    ("lru-opt1",Policy::LruOpt1,"LRU eviction with resync signalling"),
    ("lru-opt2",Policy::LruOpt2,"LRU eviction with window-compressed resync signalling")
];

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("{}",e);
        std::process::exit(1);
    }
}

fn run() -> Result<(),bounded_lzw::Error>
{
    let long_help =
"Examples:
---------
Compress:      `bounded-lzw lru compress big.bin big.lzw --alphabet extendedascii`
Decompress:    `bounded-lzw lru decompress big.lzw big.bin`";

    let mut main_cmd = Command::new("bounded-lzw")
        .about("LZW compression with bounded dictionaries and eviction policies")
        .after_long_help(long_help)
        .version(crate_version!())
        .subcommand_required(true);
    for (name,_,about) in POLICIES {
        main_cmd = main_cmd.subcommand(Command::new(name)
            .about(about)
            .subcommand_required(true)
            .subcommand(Command::new("compress")
                .arg(arg!(<input> "input path"))
                .arg(arg!(<output> "output path"))
                .arg(arg!(--alphabet <NAME> "input alphabet (ascii|extendedascii|ab)").required(true))
                .arg(arg!(--"min-bits" <N> "starting code width")
                    .value_parser(clap::value_parser!(u8)).default_value("9"))
                .arg(arg!(--"max-bits" <N> "maximum code width")
                    .value_parser(clap::value_parser!(u8)).default_value("16"))
                .about("compress a file"))
            .subcommand(Command::new("decompress")
                .arg(arg!(<input> "input path"))
                .arg(arg!(<output> "output path"))
                .about("decompress a file")));
    }

    let matches = main_cmd.get_matches();
    let (policy_name,policy_cmd) = matches.subcommand().expect(RCH);
    let policy = POLICIES.iter().find(|(name,_,_)| *name == policy_name).expect(RCH).1;

    match policy_cmd.subcommand() {
        Some(("compress",cmd)) => {
            let path_in = cmd.get_one::<String>("input").expect(RCH);
            let path_out = cmd.get_one::<String>("output").expect(RCH);
            let alphabet = Alphabet::from_name(cmd.get_one::<String>("alphabet").expect(RCH))?;
            let min_bits = *cmd.get_one::<u8>("min-bits").expect(RCH);
            let max_bits = *cmd.get_one::<u8>("max-bits").expect(RCH);
            let opt = Options::with_widths(policy,alphabet,min_bits,max_bits);
            let mut in_file = std::fs::File::open(path_in)?;
            let mut out_file = std::fs::File::create(path_out)?;
            let (in_size,out_size) = codec::compress(&mut in_file,&mut out_file,&opt)?;
            log::info!("compressed {} bytes into {}",in_size,out_size);
        },
        Some(("decompress",cmd)) => {
            let path_in = cmd.get_one::<String>("input").expect(RCH);
            let path_out = cmd.get_one::<String>("output").expect(RCH);
            let mut in_file = std::fs::File::open(path_in)?;
            let mut out_file = std::fs::File::create(path_out)?;
            let (in_size,out_size) = codec::expand(&mut in_file,&mut out_file,policy)?;
            log::info!("expanded {} bytes into {}",in_size,out_size);
        },
        _ => panic!("{}",RCH)
    }

    Ok(())
}
