mod collective {
    pub mod helpers;

    mod allgather;
    mod allreduce;
    mod broadcast;
    mod nonblocking;
}
